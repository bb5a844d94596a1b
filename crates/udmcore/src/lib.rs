//! # udmcore Architecture
//!
//! udmcore is the **object lifecycle engine** of a directory management
//! system. It turns entries of an LDAP-style directory into typed objects
//! with named properties, and turns property edits back into directory
//! writes, keeping dependent entries (DNS records, DHCP hosts, group
//! memberships, policies) consistent along the way.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Object Types (handlers/, module.rs)                        │
//! │  - Declarative property tables, mappings, options, layout   │
//! │  - Registry that recognizes the type of an entry            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Lifecycle (object/, computer.rs, policy.rs)                │
//! │  - create / modify / move / remove with rollback            │
//! │  - Computer and policy specializations                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collaborators (directory/, allocator.rs)                   │
//! │  - DirectoryClient trait, in-memory implementation          │
//! │  - Allocator for unique identifiers                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`Context`] bundles the collaborators and the [`EngineConfig`]; every
//! object holds one. There is no global state.
//!
//! ## Key Principle: No I/O Beyond the Directory
//!
//! The engine never prints, prompts or exits. Errors are [`UdmError`]
//! values; warnings that do not abort an operation are logged with
//! `tracing` and collected as [`ObjectMessage`]s on the object.
//!
//! ## Testing Strategy
//!
//! [`MemDirectory`](directory::MemDirectory) behaves like a strict LDAP
//! server (parents must exist, only leaves can be deleted or renamed) and
//! can be told to fail a specific operation. [`test_utils::TestEnv`] seeds
//! it with the containers, zones and groups the built-in types expect.
//!
//! ## Module Overview
//!
//! - [`object`]: [`DirectoryObject`] and its lifecycle
//! - [`module`]: Object type descriptors and the registry
//! - [`handlers`]: Built-in object types
//! - [`computer`]: DNS, DHCP, group and account bookkeeping of computers
//! - [`policy`]: Policy overlays in result mode
//! - [`property`], [`syntax`], [`value`]: Property descriptors and values
//! - [`mapping`]: Property <-> attribute conversion and diffs
//! - [`options`]: Options and object-class transitions
//! - [`merged`]: Attributes as they will be after a modlist
//! - [`dns`], [`dhcp`], [`groups`]: Dependent-entry maintenance
//! - [`directory`]: Directory client trait, filters, schema, in-memory server
//! - [`allocator`]: Identifier reservations
//! - [`dn`]: DN parsing and comparison
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod allocator;
pub mod computer;
pub mod config;
pub mod context;
pub mod dhcp;
pub mod directory;
pub mod dn;
pub mod dns;
pub mod error;
pub mod groups;
pub mod handlers;
pub mod hooks;
pub mod layout;
pub mod mapping;
pub mod merged;
pub mod messages;
pub mod module;
pub mod object;
pub mod options;
pub mod policy;
pub mod property;
pub mod syntax;
pub mod test_utils;
pub mod value;

pub use config::EngineConfig;
pub use context::Context;
pub use error::{Result, UdmError};
pub use messages::{MessageLevel, ObjectMessage};
pub use object::DirectoryObject;
pub use value::Value;
