use crate::error::EmptyIdentifier;

#[macro_export]
macro_rules! define_id_newtype {
    ($name:ident, $kind:literal) => {
        #[derive(
            serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(std::sync::Arc<str>);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $name {
            pub fn new(value: impl AsRef<str>) -> Result<Self, $crate::error::EmptyIdentifier> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err($crate::error::EmptyIdentifier { kind: $kind });
                }

                Ok(Self(std::sync::Arc::from(trimmed)))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = $crate::error::EmptyIdentifier;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

define_id_newtype!(DeliveryId, "delivery id");
define_id_newtype!(AgentId, "agent id");
define_id_newtype!(SubscriberId, "subscriber id");

impl From<EmptyIdentifier> for crate::error::TrackingError {
    fn from(error: EmptyIdentifier) -> Self {
        crate::error::TrackingError::InvalidInput(error.to_string())
    }
}
