//! Client authentication via GSSAPI security contexts.
//!
//! This module provides:
//! - Security-context negotiation, client and server side ([`gssapi`])
//! - Target service principal resolution ([`service_name`])
//! - Principal to policy mapping ([`policy`])
//!
//! # Example Configuration
//!
//! ```yaml
//! backend:
//!   service_principal: "vault/vault.example.com@EXAMPLE.COM"
//!   keytab_path: "/etc/vault/vault.keytab"
//!   default_policies: [default]
//!   policies:
//!     file: "/etc/vault/gssapi-policies"
//! ```

pub mod gssapi;
pub mod policy;
pub mod principal;
pub mod service_name;

pub use gssapi::{
    ContextGuard, ContextInitiator, LoginAcceptor, NegotiationStep, SecurityContext,
    SecurityContextProvider,
};
#[cfg(feature = "gssapi")]
pub use gssapi::Krb5Provider;
pub use policy::{
    create_policy_store, ConfigStore, FilePolicyStore, InMemoryPolicyStore, PolicyStore,
    StaticConfigStore,
};
pub use principal::AuthenticatedPrincipal;
pub use service_name::{ServicePrincipalName, DEFAULT_SERVICE_CLASS};
