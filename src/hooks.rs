//! Synchronous creation notifications.
//!
//! Code that creates a file or directory calls [`Context::notify`](crate::ops::Context::notify);
//! every subscriber registered for that [`HookEvent`] then runs in registration order on the
//! calling thread. The first subscriber error stops delivery and is returned to the notifier.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ops::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    FileCreated,
    DirCreated,
}

impl HookEvent {
    pub const ALL: [HookEvent; 2] = [HookEvent::FileCreated, HookEvent::DirCreated];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileCreated => "file_created",
            Self::DirCreated => "dir_created",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Subscriber = Box<dyn Fn(&Context, &Path) -> Result<()> + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    subscribers: Vec<(HookEvent, Subscriber)>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts = f.debug_map();
        for event in HookEvent::ALL {
            counts.entry(&event.as_str(), &self.count(event));
        }
        counts.finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, event: HookEvent, subscriber: F)
    where
        F: Fn(&Context, &Path) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribers.push((event, Box::new(subscriber)));
    }

    pub fn count(&self, event: HookEvent) -> usize {
        self.subscribers
            .iter()
            .filter(|(subscribed, _)| *subscribed == event)
            .count()
    }

    pub(crate) fn fire(&self, ctx: &Context, event: HookEvent, path: &Path) -> Result<()> {
        for (subscribed, subscriber) in &self.subscribers {
            if *subscribed != event {
                continue;
            }
            subscriber(ctx, path)?;
        }
        Ok(())
    }
}

/// The standard subscriber: apply the configured defaults to the new path.
pub fn apply_default_permissions(ctx: &Context, path: &Path) -> Result<()> {
    ctx.set_permissions(path, None)
}
