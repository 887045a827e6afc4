//! Thin authentication gateway for an AWS Cognito user pool: verify bearer tokens against
//! the pool's published key set and deduplicate accounts created through different sign-up
//! methods.

#![deny(clippy::all, missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod hook;
pub mod identity;
pub mod link;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
