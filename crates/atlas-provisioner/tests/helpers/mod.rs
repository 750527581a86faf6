#![allow(dead_code)]

pub mod mock_atlas_server;
pub mod test_data;
