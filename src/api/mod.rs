//! Application context and object detail assembly.

pub mod varwise_api;

pub use varwise_api::{LightCurveSeries, ObjectDetail, VarwiseApi};
