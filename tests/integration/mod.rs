//! Integration tests for the Eventline tracking pipeline

mod delivery_queue;
mod test_utils;
mod tracker_pipeline;
