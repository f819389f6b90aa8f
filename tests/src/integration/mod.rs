//! Integration flows, one module per seam.

mod fetching;
mod flow_control;
mod network;
mod pipeline;
mod stream_sync;
