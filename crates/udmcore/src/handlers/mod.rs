//! # Built-in Object Types
//!
//! Each submodule declares one family of object types as data: a static
//! property table, the attribute mapping, options, layout and the few
//! functions the generic lifecycle calls back into.
//!
//! ## Types
//!
//! - [`containers`]: `container/ou`, `container/cn`
//! - [`groups`]: `groups/group`
//! - [`computers`]: `computers/windows`
//! - [`dns`]: `dns/forward_zone`, `dns/reverse_zone`, `dns/host_record`
//! - [`dhcp`]: `dhcp/service`, `dhcp/host`
//! - [`policies`]: `policies/pwhistory`
//!
//! Everything type-specific beyond data belongs to an [`ObjectKind`]
//! specialization; adding a type means adding a table here and a line to
//! [`all`].
//!
//! [`ObjectKind`]: crate::module::ObjectKind

pub mod computers;
pub mod containers;
pub mod dhcp;
pub mod dns;
pub mod groups;
pub mod policies;

use crate::module::ObjectType;

/// Every built-in type.
pub fn all() -> Vec<ObjectType> {
    vec![
        containers::ou(),
        containers::cn(),
        groups::group(),
        computers::windows(),
        dns::forward_zone(),
        dns::reverse_zone(),
        dns::host_record(),
        dhcp::service(),
        dhcp::host(),
        policies::pwhistory(),
    ]
}
