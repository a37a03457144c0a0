// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod channel_ref;
pub mod config;
pub mod delegates;
pub mod error;
pub mod group;
pub mod links;
pub mod meta;
pub mod monitor;
pub mod prelude;
pub mod runtime;
pub mod time_tag;
pub mod value;

pub use channel_ref::ChannelRef;
pub use config::EngineConfig;
pub use delegates::*;
pub use error::*;
pub use group::*;
pub use links::*;
pub use meta::*;
pub use monitor::*;
pub use runtime::*;
pub use time_tag::TimeTagTransform;
pub use value::*;
