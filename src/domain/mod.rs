// Domain layer: models, decoded events and ports (interfaces). No HTTP here.

pub mod event;
pub mod model;
pub mod ports;

#[cfg(test)]
pub(crate) mod fakes;
