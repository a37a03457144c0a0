// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod builder;
mod configuration;
mod engine;

pub use builder::EngineBuilder;
pub use configuration::{EngineConfiguration, LinkDefinition};
pub use engine::Engine;
