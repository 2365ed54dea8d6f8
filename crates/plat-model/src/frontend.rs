//! The frontend JSON codec.
//!
//! This is the display shape exchanged with the web client. Layers become
//! `collections` with per-layer `features`, and parcels/layers carry the
//! presentation-only `style`/`title`/`featureType` fields the storage form
//! omits. The top-level `points` and `segments` arrays are always present;
//! `segments` mirrors every segment owned through the layer chain.
//!
//! Decoding follows the same permissive rules as the storage codec, and the
//! mirrored `segments` are ignored whenever `collections` are present.

use serde::{Deserialize, Deserializer, Serialize};

use crate::entities::{AttrMap, GeometryLayer, Parcel, Site};
use crate::error::Result;
use crate::ids::ObjectId;
use crate::storage::{
    GeometryDoc, PointDoc, SegmentDoc, decode_geometry, decode_point, encode_geometry_frontend,
    encode_point, encode_segment_frontend, fold_legacy_segments,
};

/// Frontend document for a [`Site`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteView {
    #[serde(default)]
    pub metadata: AttrMap,
    #[serde(default)]
    pub collections: Vec<CollectionView>,
    #[serde(default)]
    pub attributes: AttrMap,
    #[serde(default)]
    pub points: Vec<PointDoc>,
    #[serde(default)]
    pub segments: Vec<SegmentDoc>,
    // Tolerated on decode only; the encoder never writes these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_session_id"
    )]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_layer_type")]
    pub layer_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub features: Vec<FeatureView>,
    #[serde(default)]
    pub attributes: AttrMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureView {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub number: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_feature_type")]
    pub feature_type: String,
    /// Legacy clients put the area in `attributes` instead; decode falls
    /// back to it when this is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default)]
    pub attributes: AttrMap,
    #[serde(default)]
    pub style: AttrMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryDoc>,
}

fn default_true() -> bool {
    true
}

fn default_layer_type() -> String {
    "Boundary".to_string()
}

fn default_feature_type() -> String {
    "parcel".to_string()
}

fn de_session_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "sessionId must be a string or number, got {other}"
        ))),
    }
}

fn id_or_generate(id: Option<String>) -> ObjectId {
    id.map_or_else(ObjectId::generate, ObjectId::new)
}

pub fn encode_parcel_frontend(parcel: &Parcel) -> FeatureView {
    FeatureView {
        id: Some(parcel.id.to_string()),
        number: parcel.number,
        name: parcel.name.clone(),
        feature_type: parcel.feature_type.clone(),
        area: Some(parcel.area),
        attributes: parcel.attributes.clone(),
        style: parcel.style.clone(),
        geometry: parcel.geometry.as_ref().map(encode_geometry_frontend),
    }
}

pub fn decode_parcel_frontend(view: FeatureView) -> Result<Parcel> {
    let area = view.area.unwrap_or_else(|| {
        view.attributes
            .get("area")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0)
    });
    Ok(Parcel {
        id: id_or_generate(view.id),
        name: view.name,
        feature_type: view.feature_type,
        number: view.number,
        area,
        geometry: view.geometry.map(decode_geometry).transpose()?,
        style: view.style,
        attributes: view.attributes,
    })
}

pub fn encode_layer_frontend(layer: &GeometryLayer) -> CollectionView {
    CollectionView {
        id: Some(layer.id.to_string()),
        layer_type: layer.layer_type.clone(),
        name: layer.name.clone(),
        title: layer.title.clone(),
        visible: layer.visible,
        features: layer.parcels.iter().map(encode_parcel_frontend).collect(),
        attributes: layer.attributes.clone(),
    }
}

pub fn decode_layer_frontend(view: CollectionView) -> Result<GeometryLayer> {
    let mut layer = GeometryLayer {
        id: id_or_generate(view.id),
        layer_type: view.layer_type,
        name: view.name,
        title: view.title,
        visible: view.visible,
        parcels: Vec::with_capacity(view.features.len()),
        attributes: view.attributes,
    };
    for feature in view.features {
        layer.parcels.push(decode_parcel_frontend(feature)?);
    }
    Ok(layer)
}

impl Site {
    /// Encode to the frontend form.
    pub fn to_frontend(&self) -> SiteView {
        SiteView {
            metadata: self.metadata.clone(),
            collections: self.layers.iter().map(encode_layer_frontend).collect(),
            attributes: self.attributes.clone(),
            points: self.points.iter().map(encode_point).collect(),
            segments: self.segments().map(encode_segment_frontend).collect(),
            project_id: None,
            site_id: None,
            session_id: None,
        }
    }

    /// Decode from the frontend form.
    ///
    /// The site name is read from `metadata.project`; top-level segments are
    /// only folded into the default chain when no collections are present.
    pub fn from_frontend(view: SiteView) -> Result<Site> {
        let name = view
            .metadata
            .get("project")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut site = Site {
            project_id: view.project_id.unwrap_or_default(),
            id: id_or_generate(view.site_id),
            name,
            version: 0,
            history: None,
            layers: Vec::with_capacity(view.collections.len()),
            metadata: view.metadata,
            attributes: view.attributes,
            session_id: view.session_id,
            points: Vec::new(),
        };
        for collection in view.collections {
            site.layers.push(decode_layer_frontend(collection)?);
        }
        for point in view.points {
            site.points.push(decode_point(point));
        }
        if site.layers.is_empty() {
            fold_legacy_segments(&mut site, view.segments)?;
        }
        Ok(site)
    }
}
