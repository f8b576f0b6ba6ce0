use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::search::{DocumentType, SearchDocument, SearchService};

/// Export of the campaign collections the search index is built from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CampaignSnapshot {
    pub chapters: Vec<StoryChapter>,
    pub quests: Vec<Quest>,
    pub npcs: Vec<Npc>,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoryChapter {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Option<String>,
    pub objectives: Vec<String>,
    pub location: Option<String>,
    pub reward: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub race: Option<String>,
    pub occupation: Option<String>,
    pub description: String,
    pub location: Option<String>,
    pub relationship: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub id: String,
    pub name: String,
    /// City, dungeon, wilderness...
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub region: Option<String>,
    pub description: String,
    pub notable_features: Vec<String>,
}

// Non-empty fields joined by a single space
fn flatten<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl StoryChapter {
    pub fn to_document(&self) -> SearchDocument {
        let content = flatten([
            self.title.as_str(),
            self.summary.as_str(),
            self.content.as_str(),
        ]);
        let doc = SearchDocument::new(&self.id, DocumentType::Story, &self.title, content);
        match self.order {
            Some(order) => doc.with_metadata("order", order),
            None => doc,
        }
    }
}

impl Quest {
    pub fn to_document(&self) -> SearchDocument {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        fields.extend(self.objectives.iter().map(String::as_str));
        fields.extend(self.location.as_deref());
        fields.extend(self.reward.as_deref());

        let mut doc =
            SearchDocument::new(&self.id, DocumentType::Quest, &self.title, flatten(fields));
        if let Some(status) = &self.status {
            doc = doc.with_metadata("status", status.as_str());
        }
        if let Some(location) = &self.location {
            doc = doc.with_metadata("location", location.as_str());
        }
        doc
    }
}

impl Npc {
    pub fn to_document(&self) -> SearchDocument {
        let content = flatten(
            [
                Some(self.name.as_str()),
                self.race.as_deref(),
                self.occupation.as_deref(),
                Some(self.description.as_str()),
                self.location.as_deref(),
                self.relationship.as_deref(),
                self.notes.as_deref(),
            ]
            .into_iter()
            .flatten(),
        );

        let mut doc = SearchDocument::new(&self.id, DocumentType::Npc, &self.name, content);
        if let Some(location) = &self.location {
            doc = doc.with_metadata("location", location.as_str());
        }
        doc
    }
}

impl Location {
    pub fn to_document(&self) -> SearchDocument {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.kind.as_deref());
        fields.extend(self.region.as_deref());
        fields.push(self.description.as_str());
        fields.extend(self.notable_features.iter().map(String::as_str));

        let mut doc =
            SearchDocument::new(&self.id, DocumentType::Location, &self.name, flatten(fields));
        if let Some(kind) = &self.kind {
            doc = doc.with_metadata("kind", kind.as_str());
        }
        doc
    }
}

impl CampaignSnapshot {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse campaign snapshot")
    }

    /// Documents bucketed by type, ready for `SearchService::initialize_index`.
    pub fn into_documents(self) -> BTreeMap<DocumentType, Vec<SearchDocument>> {
        let mut documents = BTreeMap::new();
        documents.insert(
            DocumentType::Story,
            self.chapters.iter().map(StoryChapter::to_document).collect(),
        );
        documents.insert(
            DocumentType::Quest,
            self.quests.iter().map(Quest::to_document).collect(),
        );
        documents.insert(
            DocumentType::Npc,
            self.npcs.iter().map(Npc::to_document).collect(),
        );
        documents.insert(
            DocumentType::Location,
            self.locations.iter().map(Location::to_document).collect(),
        );
        documents
    }
}

pub async fn load_snapshot(snapshot_path: impl AsRef<Path>) -> Result<CampaignSnapshot> {
    let snapshot_path = snapshot_path.as_ref();
    tracing::info!("Reading campaign snapshot from {}", snapshot_path.display());

    let data = tokio::fs::read_to_string(snapshot_path)
        .await
        .with_context(|| format!("Failed to read snapshot {}", snapshot_path.display()))?;

    CampaignSnapshot::parse(&data)
        .with_context(|| format!("Invalid snapshot {}", snapshot_path.display()))
}

/// Load the snapshot and replace the service's index with it.
/// Returns the number of indexed documents.
pub async fn build_index(
    snapshot_path: impl AsRef<Path>,
    service: &mut SearchService,
) -> Result<usize> {
    let snapshot = load_snapshot(snapshot_path).await?;
    let documents = snapshot.into_documents();

    for (doc_type, docs) in &documents {
        tracing::info!("Indexed {} {} documents", docs.len(), doc_type);
    }

    service.initialize_index(documents);
    Ok(service.document_count())
}
