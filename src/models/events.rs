// src/models/events.rs

use serde::Serialize;
use utoipa::ToSchema;

/// Evento empurrado no canal de notificações (fire-and-forget).
/// O transporte até os clientes conectados é colaborador externo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    RoomStatusChanged,
    OvertimeReached,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub data: serde_json::Value,
}
