use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    json,
    Value,
};

use crate::core::{
    http::http_client,
    FlashcardNote,
    YomicardError,
};

pub const DEFAULT_ANKICONNECT_URL: &str = "http://localhost:8765";
const ANKICONNECT_VERSION: u32 = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self { result: Some(result), error: None }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self { result: None, error: Some(error.into()) }
    }

    /// Collapses the AnkiConnect envelope into a `Result`.
    pub fn into_result(self) -> Result<T, YomicardError> {
        if let Some(error) = self.error {
            return Err(YomicardError::Anki(error));
        }
        self.result.ok_or_else(|| YomicardError::Anki("empty result".to_string()))
    }
}

/// `addNote` parameters. Duplicates are refused per deck; the export loop relies on that.
pub fn note_params(note: &FlashcardNote) -> Value {
    let fields: serde_json::Map<String, Value> =
        note.fields.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();

    json!({
        "note": {
            "deckName": note.deck,
            "modelName": note.model,
            "fields": fields,
            "tags": note.tags,
            "options": {
                "allowDuplicate": false,
                "duplicateScope": "deck",
            },
        }
    })
}

/// Search query for notes of `word` in `deck`, optionally limited to one note model.
pub fn word_query(deck: &str, word: &str, model: Option<&str>) -> String {
    let mut query = format!("\"deck:{}\" \"w:{}\"", escape_quotes(deck), escape_quotes(word));
    if let Some(model) = model {
        query.push_str(&format!(" \"note:{}\"", escape_quotes(model)));
    }
    query
}

fn escape_quotes(term: &str) -> String {
    term.replace('"', "\\\"")
}

#[derive(Debug, Clone)]
pub struct AnkiConnect {
    client: Client,
    url: String,
}

impl AnkiConnect {
    pub fn new(url: &str) -> Result<Self, YomicardError> {
        Ok(Self { client: http_client()?, url: url.to_string() })
    }

    async fn make_request<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<ApiResponse<T>, YomicardError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), Value::String(action.to_string()));
        body.insert("version".to_string(), Value::Number(ANKICONNECT_VERSION.into()));

        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        let response: ApiResponse<T> =
            self.client.post(&self.url).json(&body).send().await?.json().await?;

        Ok(response)
    }

    /// Liveness check; fails if AnkiConnect isn't reachable.
    pub async fn version(&self) -> Result<u32, YomicardError> {
        self.make_request::<u32>("version", None).await?.into_result()
    }

    pub async fn deck_names(&self) -> Result<Vec<String>, YomicardError> {
        self.make_request::<Vec<String>>("deckNames", None).await?.into_result()
    }

    pub async fn model_names(&self) -> Result<Vec<String>, YomicardError> {
        self.make_request::<Vec<String>>("modelNames", None).await?.into_result()
    }

    pub async fn find_notes(&self, query: &str) -> Result<Vec<u64>, YomicardError> {
        let params = json!({ "query": query });
        self.make_request::<Vec<u64>>("findNotes", Some(params)).await?.into_result()
    }

    pub async fn add_note(&self, note: &FlashcardNote) -> Result<ApiResponse<u64>, YomicardError> {
        self.make_request("addNote", Some(note_params(note))).await
    }
}
