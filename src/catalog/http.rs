//! Blocking REST client for the remote metadata catalog.
//!
//! Assets live under `{base}/asset`; type records live under
//! `{base}/{dataspace}/{dataset}/datatype`. Lookups by name or parent use the
//! catalog's `predicate` query parameter. Every request carries HTTP basic
//! auth and the configured timeout; nothing is retried.

use crate::catalog::identity::{AssetKind, EntityId, TypeId};
use crate::catalog::model::{Entity, TypeRecord};
use crate::catalog::store::{CatalogStore, StoreError};
use crate::config::{AssetTypeIds, CatalogEndpoint};
use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    base_url: String,
    datatype_path: String,
    user: Option<String>,
    password: Option<String>,
    asset_types: AssetTypeIds,
    client: Client,
}

// Wire DTOs matching the catalog's asset and datatype resources.

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire_id"
    )]
    id: Option<u64>,
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, deserialize_with = "wire_text")]
    asset_type: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "id_as_text",
        deserialize_with = "wire_id"
    )]
    asset_data_type: Option<u64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    comment: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "id_as_text",
        deserialize_with = "wire_id"
    )]
    parent: Option<u64>,
    #[serde(default)]
    data_element_auto_assigned: bool,
    #[serde(default)]
    is_disabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataTypeRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire_id"
    )]
    id: Option<u64>,
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    built_in: bool,
    #[serde(default)]
    complex_type: bool,
}

impl AssetRecord {
    fn from_entity(entity: &Entity, types: &AssetTypeIds) -> Self {
        let asset_type = match &entity.kind {
            AssetKind::Element => types.element.clone(),
            AssetKind::Property => types.property.clone(),
            AssetKind::Other(raw) => raw.clone(),
        };
        Self {
            id: entity.id.map(|id| id.0),
            name: entity.name.clone(),
            label: entity.label.clone(),
            description: entity.description.clone(),
            asset_type,
            asset_data_type: entity.type_ref.map(|id| id.0),
            comment: entity.side_channel.clone(),
            parent: entity.parent.map(|id| id.0),
            data_element_auto_assigned: false,
            is_disabled: false,
        }
    }

    fn into_entity(self, types: &AssetTypeIds) -> Entity {
        let kind = if self.asset_type == types.element {
            AssetKind::Element
        } else if self.asset_type == types.property {
            AssetKind::Property
        } else {
            AssetKind::Other(self.asset_type)
        };
        Entity {
            id: self.id.map(EntityId),
            name: self.name,
            label: self.label,
            kind,
            description: self.description,
            type_ref: self.asset_data_type.map(TypeId),
            side_channel: self.comment,
            parent: self.parent.map(EntityId),
        }
    }
}

impl HttpCatalog {
    pub fn new(endpoint: &CatalogEndpoint) -> Result<Self> {
        let client = Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .context("Failed to build catalog HTTP client")?;
        Ok(Self {
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            datatype_path: format!("{}/{}/datatype", endpoint.dataspace, endpoint.dataset),
            user: endpoint.user.clone(),
            password: endpoint.password.clone(),
            asset_types: endpoint.asset_types.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        predicate: Option<&str>,
    ) -> Result<T, StoreError> {
        let url = self.url(path);
        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(predicate) = predicate {
            request = request.query(&[("predicate", predicate)]);
        }
        debug!(%url, predicate = predicate.unwrap_or_default(), "GET");
        let response = self
            .authorize(request)
            .send()
            .map_err(|source| transport("GET", &url, source))?;
        read_json("GET", &url, response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, StoreError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .authorize(self.client.post(&url).json(body))
            .send()
            .map_err(|source| transport("POST", &url, source))?;
        read_json("POST", &url, response)
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        let url = self.url(path);
        debug!(%url, "DELETE");
        let response = self
            .authorize(
                self.client
                    .delete(&url)
                    .header(reqwest::header::ACCEPT, "application/json"),
            )
            .send()
            .map_err(|source| transport("DELETE", &url, source))?;
        check_status("DELETE", &url, &response)
    }
}

impl CatalogStore for HttpCatalog {
    fn create_entity(&mut self, entity: &Entity) -> Result<EntityId, StoreError> {
        let record = AssetRecord::from_entity(entity, &self.asset_types);
        let created: AssetRecord = self.post("asset", &record)?;
        created.id.map(EntityId).ok_or_else(|| StoreError::NotFound {
            what: "id of created asset",
            id: entity.name.clone(),
        })
    }

    fn find_entities_by_name(&self, name: &str) -> Result<Vec<Entity>, StoreError> {
        let predicate = format!("name='{}'", quote(name));
        let found: Option<Vec<AssetRecord>> = self.get("asset", Some(&predicate))?;
        Ok(found
            .unwrap_or_default()
            .into_iter()
            .map(|record| record.into_entity(&self.asset_types))
            .collect())
    }

    fn find_children(&self, parent: EntityId) -> Result<Vec<Entity>, StoreError> {
        let predicate = format!("parent='{parent}'");
        // An empty result may come back as `null`.
        let found: Option<Vec<AssetRecord>> = self.get("asset", Some(&predicate))?;
        Ok(found
            .unwrap_or_default()
            .into_iter()
            .map(|record| record.into_entity(&self.asset_types))
            .collect())
    }

    fn delete_entity(&mut self, id: EntityId) -> Result<(), StoreError> {
        self.delete(&format!("asset/{id}"))
    }

    fn create_type_record(&mut self, name: &str, complex: bool) -> Result<TypeId, StoreError> {
        let record = DataTypeRecord {
            id: None,
            name: name.to_string(),
            label: name.to_string(),
            built_in: false,
            complex_type: complex,
        };
        let created: DataTypeRecord = self.post(&self.datatype_path, &record)?;
        created.id.map(TypeId).ok_or_else(|| StoreError::NotFound {
            what: "id of created datatype",
            id: name.to_string(),
        })
    }

    fn find_type_record_by_name(&self, name: &str) -> Result<Option<TypeId>, StoreError> {
        let predicate = format!("name='{}'", quote(name));
        let found: Option<Vec<DataTypeRecord>> = self.get(&self.datatype_path, Some(&predicate))?;
        Ok(found.unwrap_or_default().into_iter().find_map(|record| record.id.map(TypeId)))
    }

    fn find_type_record_by_id(&self, id: TypeId) -> Result<TypeRecord, StoreError> {
        let record: DataTypeRecord = self.get(&format!("{}/{id}", self.datatype_path), None)?;
        Ok(TypeRecord {
            id: record.id.map(TypeId).unwrap_or(id),
            name: record.name,
            complex: record.complex_type,
        })
    }

    fn delete_type_record(&mut self, id: TypeId) -> Result<(), StoreError> {
        self.delete(&format!("{}/{id}", self.datatype_path))
    }
}

fn transport(method: &'static str, url: &str, source: reqwest::Error) -> StoreError {
    StoreError::Transport {
        method,
        url: url.to_string(),
        source,
    }
}

fn check_status(method: &'static str, url: &str, response: &Response) -> Result<(), StoreError> {
    let status = response.status();
    debug!(%url, status = status.as_u16(), "catalog response");
    if status.is_success() {
        Ok(())
    } else {
        Err(StoreError::Status {
            method,
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

fn read_json<T: DeserializeOwned>(
    method: &'static str,
    url: &str,
    response: Response,
) -> Result<T, StoreError> {
    check_status(method, url, &response)?;
    let body = response
        .text()
        .map_err(|source| transport(method, url, source))?;
    serde_json::from_str(&body).map_err(|source| StoreError::Malformed {
        url: url.to_string(),
        source,
    })
}

/// Escape single quotes for the catalog's predicate syntax.
fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Number(u64),
    Text(String),
}

fn wire_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawScalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawScalar::Number(value)) => Ok(Some(value)),
        Some(RawScalar::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawScalar::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn wire_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawScalar>::deserialize(deserializer)? {
        None => String::new(),
        Some(RawScalar::Number(value)) => value.to_string(),
        Some(RawScalar::Text(text)) => text,
    })
}

fn id_as_text<S>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match id {
        Some(value) => serializer.serialize_str(&value.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn types() -> AssetTypeIds {
        AssetTypeIds::default()
    }

    #[test]
    fn asset_record_uses_catalog_field_names() {
        let entity = Entity::property("event_ts")
            .with_parent(EntityId(12))
            .with_type(Some(TypeId(3)))
            .with_description(Some("When the event was dispatched"))
            .with_side_channel("{\"title\":\"ts\"}".to_string());
        let wire = serde_json::to_value(AssetRecord::from_entity(&entity, &types())).unwrap();
        assert_eq!(
            wire,
            json!({
                "name": "event_ts",
                "label": "event_ts",
                "description": "When the event was dispatched",
                "assetType": "25",
                "assetDataType": "3",
                "comment": "{\"title\":\"ts\"}",
                "parent": "12",
                "dataElementAutoAssigned": false,
                "isDisabled": false
            })
        );
    }

    #[test]
    fn asset_record_accepts_numeric_and_text_ids() {
        let raw = json!({
            "id": 211,
            "name": "heartbeat",
            "label": "heartbeat",
            "assetType": 24,
            "assetDataType": "",
            "parent": "17"
        });
        let record: AssetRecord = serde_json::from_value(raw).unwrap();
        let entity = record.into_entity(&types());
        assert_eq!(entity.id, Some(EntityId(211)));
        assert_eq!(entity.parent, Some(EntityId(17)));
        assert_eq!(entity.type_ref, None);
        assert_eq!(entity.kind, AssetKind::Element);
        assert!(entity.side_channel.is_empty());
    }

    #[test]
    fn unknown_asset_types_are_preserved() {
        let record: AssetRecord =
            serde_json::from_value(json!({"name": "x", "assetType": "99"})).unwrap();
        let entity = record.into_entity(&types());
        assert_eq!(entity.kind, AssetKind::Other("99".to_string()));
        let back = AssetRecord::from_entity(&entity, &types());
        assert_eq!(back.asset_type, "99");
    }

    #[test]
    fn datatype_record_matches_catalog_shape() {
        let record = DataTypeRecord {
            id: None,
            name: "#/components/schemas/Foo".to_string(),
            label: "#/components/schemas/Foo".to_string(),
            built_in: false,
            complex_type: true,
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "name": "#/components/schemas/Foo",
                "label": "#/components/schemas/Foo",
                "builtIn": false,
                "complexType": true
            })
        );
    }

    #[test]
    fn predicates_escape_quotes() {
        assert_eq!(quote("o'brien"), "o''brien");
        assert_eq!(quote("plain"), "plain");
    }

    #[test]
    fn client_builds_paths_from_endpoint() {
        let endpoint = CatalogEndpoint {
            base_url: "https://catalog.example.com/ebx/".to_string(),
            dataspace: "Space".to_string(),
            dataset: "Set".to_string(),
            user: None,
            password: None,
            timeout: Duration::from_secs(1),
            asset_types: types(),
        };
        let catalog = HttpCatalog::new(&endpoint).unwrap();
        assert_eq!(catalog.url("asset"), "https://catalog.example.com/ebx/asset");
        assert_eq!(catalog.datatype_path, "Space/Set/datatype");
    }
}
