pub mod buffer_pool;
pub mod frame_queue;
