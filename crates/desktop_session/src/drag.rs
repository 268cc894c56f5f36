//! Generic drag-and-drop protocol between drag sources and registered drop zones.
//!
//! The coordinator is a two-state machine (`Idle`, `Dragging`). Only one drag may be in flight;
//! a second [`DragCoordinator::begin_drag`] is rejected rather than replacing the first. Drop
//! zones are registered independently of any drag and stay registered until removed.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SessionError;
use crate::model::{PointerPosition, WindowId};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropZoneId(pub String);

impl DropZoneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DropZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DropZoneId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Data carried by a drag, kept as JSON so it can cross window or document boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DragPayload(Value);

impl DragPayload {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Rebuilds a payload from serialized transfer data (for example a browser `DataTransfer`
    /// string written by another document).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PayloadDecode`] when `raw` is not valid JSON.
    pub fn from_transfer_text(raw: &str) -> Result<Self, SessionError> {
        serde_json::from_str(raw)
            .map(Self)
            .map_err(|err| SessionError::PayloadDecode(err.to_string()))
    }

    pub fn to_transfer_text(&self) -> String {
        self.0.to_string()
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Reads the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PayloadDecode`] when the payload does not have the shape of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        T::deserialize(&self.0).map_err(|err| SessionError::PayloadDecode(err.to_string()))
    }
}

/// Widget a drag started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragSource {
    pub element: String,
    pub window_id: Option<WindowId>,
}

impl DragSource {
    pub fn element(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            window_id: None,
        }
    }

    pub fn in_window(mut self, window_id: WindowId) -> Self {
        self.window_id = Some(window_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub source: DragSource,
    pub payload: DragPayload,
    pub origin: PointerPosition,
    pub pointer: PointerPosition,
}

/// What a drop handler learns about the drop besides the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropContext {
    pub zone_id: DropZoneId,
    pub source: DragSource,
    pub pointer: PointerPosition,
}

pub type DropHandler = Box<dyn FnMut(&DragPayload, &DropContext) -> Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// A handler accepted the drop and returned this value.
    Delivered(Value),
    /// No handler is registered for the zone; a normal outcome for drops onto empty space.
    NoHandler,
    /// No drag was in flight.
    NotDragging,
}

#[derive(Default)]
pub struct DragCoordinator {
    session: Option<DragSession>,
    targets: HashMap<DropZoneId, DropHandler>,
}

impl fmt::Debug for DragCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut zones: Vec<_> = self.targets.keys().collect();
        zones.sort();
        f.debug_struct("DragCoordinator")
            .field("session", &self.session)
            .field("zones", &zones)
            .finish()
    }
}

impl DragCoordinator {
    /// Starts a drag.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyDragging`] while another drag is in flight; the in-flight
    /// drag is left untouched.
    pub fn begin_drag(
        &mut self,
        source: DragSource,
        payload: DragPayload,
        pointer: PointerPosition,
    ) -> Result<(), SessionError> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyDragging);
        }
        debug!(element = %source.element, "drag started");
        self.session = Some(DragSession {
            source,
            payload,
            origin: pointer,
            pointer,
        });
        Ok(())
    }

    /// Tracks the pointer of the in-flight drag. Does nothing while idle.
    pub fn update_position(&mut self, pointer: PointerPosition) {
        if let Some(session) = self.session.as_mut() {
            session.pointer = pointer;
        }
    }

    /// Returns to idle, dropping any payload. Safe to call in any state.
    pub fn end_drag(&mut self) {
        if self.session.take().is_some() {
            debug!("drag ended");
        }
    }

    /// Registers or replaces the handler for `zone_id`.
    pub fn register_drop_target(
        &mut self,
        zone_id: impl Into<DropZoneId>,
        handler: impl FnMut(&DragPayload, &DropContext) -> Value + 'static,
    ) {
        self.targets.insert(zone_id.into(), Box::new(handler));
    }

    /// Removes the handler for `zone_id`, returning whether one was registered.
    pub fn unregister_drop_target(&mut self, zone_id: &DropZoneId) -> bool {
        self.targets.remove(zone_id).is_some()
    }

    /// Delivers the in-flight payload to the handler for `zone_id` and ends the drag.
    pub fn attempt_drop(&mut self, zone_id: &DropZoneId) -> DropOutcome {
        let Some(session) = self.session.take() else {
            return DropOutcome::NotDragging;
        };
        let Some(handler) = self.targets.get_mut(zone_id) else {
            debug!(zone = %zone_id, "drop outside any registered zone");
            return DropOutcome::NoHandler;
        };

        let context = DropContext {
            zone_id: zone_id.clone(),
            source: session.source,
            pointer: session.pointer,
        };
        debug!(zone = %zone_id, "drop delivered");
        DropOutcome::Delivered(handler(&session.payload, &context))
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_payload(&self) -> Option<&DragPayload> {
        self.session.as_ref().map(|session| &session.payload)
    }

    pub fn current_source(&self) -> Option<&DragSource> {
        self.session.as_ref().map(|session| &session.source)
    }

    pub fn pointer(&self) -> Option<PointerPosition> {
        self.session.as_ref().map(|session| session.pointer)
    }

    pub fn drop_target_count(&self) -> usize {
        self.targets.len()
    }

    /// Drops every registered handler so none can run against torn-down UI.
    pub fn clear_drop_targets(&mut self) {
        self.targets.clear();
    }
}
