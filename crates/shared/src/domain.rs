use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownView;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(AvailCheckId);

/// Named panels of the page. Each one maps to a container with id `{name}-view`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewId {
    Home,
    Index,
    Standin,
    UserAccount,
    StandinProfile,
    RegisterUser,
    RegisterStandin,
    RegistrationPending,
    Login,
    Logout,
    Bookings,
    Availchecks,
    Availabilities,
}

impl ViewId {
    pub const ALL: [ViewId; 13] = [
        ViewId::Home,
        ViewId::Index,
        ViewId::Standin,
        ViewId::UserAccount,
        ViewId::StandinProfile,
        ViewId::RegisterUser,
        ViewId::RegisterStandin,
        ViewId::RegistrationPending,
        ViewId::Login,
        ViewId::Logout,
        ViewId::Bookings,
        ViewId::Availchecks,
        ViewId::Availabilities,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Index => "index",
            Self::Standin => "standin",
            Self::UserAccount => "user_account",
            Self::StandinProfile => "standin_profile",
            Self::RegisterUser => "register_user",
            Self::RegisterStandin => "register_standin",
            Self::RegistrationPending => "registration_pending",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Bookings => "bookings",
            Self::Availchecks => "availchecks",
            Self::Availabilities => "availabilities",
        }
    }

    pub fn container_id(self) -> String {
        format!("{}-view", self.as_str())
    }

    /// Views forced visible alongside this one.
    pub fn companions(self) -> &'static [ViewId] {
        match self {
            Self::Availchecks => &[ViewId::Bookings, ViewId::Availabilities],
            _ => &[],
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewId {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewId::ALL
            .into_iter()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

/// User reference issued by the backend on registration. Only `id` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl UserRef {
    pub fn new(id: i64) -> Self {
        Self {
            id: UserId(id),
            attributes: serde_json::Map::new(),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.attributes.get("username").and_then(|v| v.as_str())
    }
}
