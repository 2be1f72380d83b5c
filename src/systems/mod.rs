pub mod sdk;
pub mod agent;
pub mod grid;
pub mod metric;
#[cfg(feature="protocol-jump")] pub mod jump;
#[cfg(feature="protocol-swap")] pub mod swap;
