pub mod alert;
pub mod market;
pub mod product;
pub mod shipment;
pub mod weather;
