use crate::allocator::ResourceKind;
use crate::directory::DirectoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UdmError {
    #[error("Invalid syntax for {property}: {message}")]
    Syntax { property: String, message: String },

    #[error("Value required for {0}")]
    RequiredValue(String),

    #[error("Information provided is not sufficient: {}", .0.join(", "))]
    InsufficientInformation(Vec<String>),

    #[error("Value may not change: {0}")]
    NotEditable(String),

    #[error("Value is fixed by policy: {0}")]
    PolicyFixedAttribute(String),

    #[error("Object exists: {0}")]
    AlreadyExists(String),

    #[error("No such object: {0}")]
    NotFound(String),

    #[error("No lock available for {kind}: {value}")]
    NoLockAvailable { kind: ResourceKind, value: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid superordinate: {0}")]
    InvalidSuperordinate(String),

    #[error("Unknown property: {0}")]
    NoSuchProperty(String),

    #[error("Invalid DHCP entry: {0}")]
    InvalidDhcpEntry(String),

    #[error("Invalid DNS alias entry: {0}")]
    InvalidDnsAliasEntry(String),

    #[error("DNS alias is already in use: {0}")]
    DnsAliasAlreadyUsed(String),

    #[error("Common name too long: {0}")]
    CommonNameTooLong(String),

    #[error("MAC address already in use: {0}")]
    MacAlreadyUsed(String),

    #[error("IP address already in use: {0}")]
    IpAlreadyUsed(String),

    #[error("Could not create policy {name} after {attempts} attempts")]
    PolicyRetriesExhausted { name: String, attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(#[from] confique::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl UdmError {
    pub fn syntax(property: impl Into<String>, message: impl Into<String>) -> Self {
        UdmError::Syntax {
            property: property.into(),
            message: message.into(),
        }
    }

    /// True for both the engine's and the transport's "no such object".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            UdmError::NotFound(_) | UdmError::Directory(DirectoryError::NoSuchObject(_))
        )
    }

    /// True for both the engine's and the transport's "already exists".
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            UdmError::AlreadyExists(_) | UdmError::Directory(DirectoryError::AlreadyExists(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, UdmError>;
