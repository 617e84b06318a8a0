//! # skidspar-client
//!
//! HTTP collaborators of the reconciliation pass: the NGSI-LD context broker
//! ([`HttpBrokerClient`], behind the [`BrokerClient`] trait) and the provider
//! status feed ([`StatusFetcher`]).

pub mod broker;
pub mod error;
pub mod fragment;
pub mod ngsild;
pub mod provider;

pub use broker::{BrokerClient, BrokerConfig, EntityState, HttpBrokerClient, ListedEntity};
pub use error::ClientError;
pub use fragment::Fragment;
pub use provider::StatusFetcher;
