use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    client::{FetchError, Fetched},
    models::{ParamError, SimulationForm, SimulationResult},
};

pub const SESSION_COOKIE: &str = "chainfly_session";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    #[default]
    Home,
    Simulate,
    Trends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Simulate,
    ViewTrends,
    Back,
}

impl FromStr for Action {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, NavError> {
        match s {
            "simulate" => Ok(Self::Simulate),
            "trends" => Ok(Self::ViewTrends),
            "back" => Ok(Self::Back),
            other => Err(NavError::UnknownAction(other.to_string())),
        }
    }
}

impl Action {
    pub fn slug(self) -> &'static str {
        match self {
            Self::Simulate => "simulate",
            Self::ViewTrends => "trends",
            Self::Back => "back",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Simulate => "Simulate",
            Self::ViewTrends => "View Trends",
            Self::Back => "Back",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Home => "home",
            Self::Simulate => "simulate",
            Self::Trends => "trends",
        })
    }
}

impl Screen {
    /// The only edges are home <-> simulate and home <-> trends.
    pub fn apply(self, action: Action) -> Option<Screen> {
        match (self, action) {
            (Self::Home, Action::Simulate) => Some(Self::Simulate),
            (Self::Home, Action::ViewTrends) => Some(Self::Trends),
            (Self::Simulate | Self::Trends, Action::Back) => Some(Self::Home),
            _ => None,
        }
    }

    pub fn actions(self) -> &'static [Action] {
        match self {
            Self::Home => &[Action::Simulate, Action::ViewTrends],
            Self::Simulate | Self::Trends => &[Action::Back],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("action {action:?} is not available on the {from} screen")]
    NotAllowed { from: Screen, action: &'static str },
}

/// What the last press of "Run" produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(Fetched<SimulationResult>),
    Failed(FetchError),
    Invalid(ParamError),
}

/// Everything one browser carries between requests.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub screen: Screen,
    pub form: SimulationForm,
    pub last_result: Option<SimulationResult>,
    pub last_run: Option<RunOutcome>,
}

impl Session {
    pub fn navigate(&mut self, action: Action) -> Result<Screen, NavError> {
        let next = self.screen.apply(action).ok_or(NavError::NotAllowed {
            from: self.screen,
            action: action.slug(),
        })?;
        if self.screen == Screen::Simulate {
            self.last_run = None;
        }
        self.screen = next;
        Ok(next)
    }

    /// Only a successful run replaces the last result; failures leave it in place.
    /// A run that lands after the user left the simulate screen is not displayed.
    pub fn record_run(&mut self, outcome: RunOutcome) {
        if let RunOutcome::Success(fetched) = &outcome {
            self.last_result = Some(fetched.payload.clone());
        }
        if self.screen == Screen::Simulate {
            self.last_run = Some(outcome);
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    /// Returns the id to use for this request and whether it was freshly minted.
    /// Nothing is stored until the first [`SessionStore::update`]; an id with no
    /// entry reads as a default session.
    pub fn resolve(&self, id: Option<Uuid>) -> (Uuid, bool) {
        match id {
            Some(id) => (id, false),
            None => (Uuid::new_v4(), true),
        }
    }

    pub fn snapshot(&self, id: Uuid) -> Session {
        self.inner.lock().get(&id).cloned().unwrap_or_default()
    }

    /// Inserts a default session for `id` if there is none yet.
    pub fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut map = self.inner.lock();
        f(map.entry(id).or_default())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Extracts the session id from a `Cookie` header value.
pub fn session_id_from_cookie(header: &str) -> Option<Uuid> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}
