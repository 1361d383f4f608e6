//! Step graphs for fit/predict pipelines.
//!
//! Steps are registered in a [`StepRegistry`] and connected through
//! [`DataHandle`]s. A [`Pipeline`] declares which handles are its inputs and
//! outputs, keeps only the steps those outputs need, orders them, and replays
//! that plan for training and inference.
//!
//! ```
//! use tessera_core::{Lambda, Pipeline, PipelineConfig, StepRegistry, StepSpec, Value};
//!
//! let mut registry = StepRegistry::new();
//! let x = registry.add_input("x");
//! let double = Lambda::new(|xs| {
//!     let doubled = xs[0].to_vec().iter().map(|v| v * 2.0).collect();
//!     Ok(vec![Value::series(doubled)])
//! });
//! let doubled = registry.add_step(StepSpec::new("double", double).inputs(&[x.clone()])).unwrap();
//!
//! let pipeline = Pipeline::new(registry, &[x], &doubled, PipelineConfig::default()).unwrap();
//! let out = pipeline.predict(vec![Value::series(vec![1.0, 2.0])]).unwrap();
//! assert_eq!(out.single(), Some(Value::series(vec![2.0, 4.0])));
//! ```

pub mod analysis;
pub mod compute;
pub mod display;
pub mod graph;
pub mod model;
pub mod step;
pub mod store;

pub use compute::{ExecutionError, Value};
pub use graph::{GraphSnapshot, StepGraph};
pub use model::{BuildError, BuildWarning, Pipeline, PipelineConfig, Prediction, UnusedInputPolicy};
pub use step::{Capabilities, Lambda, Operator, StepError};
pub use store::{DataHandle, RegistryError, Shape, StepId, StepRegistry, StepSpec};
