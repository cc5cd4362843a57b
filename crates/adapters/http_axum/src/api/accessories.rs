//! JSON handlers for bridged accessories and their attributes.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use duolight_app::ports::EventPublisher;
use duolight_app::services::accessory::{AccessoryHandle, AccessoryStatus};
use duolight_app::services::attribute::Lightbulb;
use duolight_domain::attribute::{Attribute, AttributeValue};
use duolight_domain::error::ValidationError;
use duolight_domain::id::AccessoryId;
use duolight_domain::protocol::Channel;

use crate::error::ApiError;
use crate::state::AppState;

/// Which channel values are still defaults, not yet confirmed by the fixture.
#[derive(Debug, Serialize)]
pub struct Provisional {
    pub white: bool,
    pub color: bool,
}

/// One accessory as seen by the host.
#[derive(Debug, Serialize)]
pub struct AccessoryView {
    pub id: AccessoryId,
    pub name: String,
    pub address: String,
    pub on: bool,
    pub brightness: u8,
    pub hue: u16,
    pub saturation: u8,
    pub white_on: bool,
    pub color_on: bool,
    pub active_channel: Channel,
    pub provisional: Provisional,
    pub connection: &'static str,
}

impl From<AccessoryStatus> for AccessoryView {
    fn from(status: AccessoryStatus) -> Self {
        Self {
            id: status.info.id,
            name: status.info.name,
            address: status.info.address,
            on: status.snapshot.on,
            brightness: status.snapshot.brightness,
            hue: status.snapshot.hue,
            saturation: status.snapshot.saturation,
            white_on: status.white_on,
            color_on: status.color_on,
            active_channel: status.active_channel,
            provisional: Provisional {
                white: status.white_provisional,
                color: status.color_provisional,
            },
            connection: status.connection.as_str(),
        }
    }
}

/// Body of attribute reads and writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttributeBody {
    pub value: AttributeValue,
}

async fn resolve<P>(state: &AppState<P>, id: &str) -> Result<AccessoryHandle, ApiError>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    let id = AccessoryId::from_str(id).map_err(|_| ValidationError::InvalidId(id.to_string()))?;
    Ok(state.bridge.get(id).await?)
}

/// `GET /api/accessories`
pub async fn list<P>(State(state): State<AppState<P>>) -> Result<Json<Vec<AccessoryView>>, ApiError>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    let mut views = Vec::new();
    for handle in state.bridge.list().await {
        views.push(handle.status().await?.into());
    }
    Ok(Json(views))
}

/// `GET /api/accessories/{id}`
pub async fn get<P>(
    State(state): State<AppState<P>>,
    Path(id): Path<String>,
) -> Result<Json<AccessoryView>, ApiError>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    let handle = resolve(&state, &id).await?;
    Ok(Json(handle.status().await?.into()))
}

/// `GET /api/accessories/{id}/{attribute}`
pub async fn read_attribute<P>(
    State(state): State<AppState<P>>,
    Path((id, attribute)): Path<(String, String)>,
) -> Result<Json<AttributeBody>, ApiError>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    let attribute = Attribute::from_str(&attribute)?;
    let handle = resolve(&state, &id).await?;

    let value = Lightbulb::new(&handle).read(attribute).await?;
    Ok(Json(AttributeBody { value }))
}

/// `PUT /api/accessories/{id}/{attribute}`
pub async fn write_attribute<P>(
    State(state): State<AppState<P>>,
    Path((id, attribute)): Path<(String, String)>,
    Json(body): Json<AttributeBody>,
) -> Result<Json<AccessoryView>, ApiError>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    let attribute = Attribute::from_str(&attribute)?;
    let handle = resolve(&state, &id).await?;

    Lightbulb::new(&handle).write(attribute, body.value).await?;
    Ok(Json(handle.status().await?.into()))
}
