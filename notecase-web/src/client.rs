//! Client of the notes API served by this crate.
use notecase::{Note, NoteID};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::json;
use thiserror::Error;
use url::Url;

const CONTENT_FIELD: &str = "content";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("error building URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("error invoking API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid status code: {status} (response: {body})")]
    Status { status: StatusCode, body: String },
}

pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl Client {
    /// A client of the server at `base_url`, such as `http://localhost:3333`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Client {
            http: reqwest::Client::new(),
            base_url,
            token: None,
        })
    }

    /// Send `token` as a bearer token with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let url = self.base_url.join(path)?;
        let request = self.http.request(method, url);
        Ok(match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await?.trim().to_owned();
            return Err(ClientError::Status { status, body });
        }
        Ok(response)
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>, ClientError> {
        let request = self.request(Method::GET, "notes")?;
        Ok(Self::send(request).await?.json().await?)
    }

    pub async fn create_note(&self, title: &str) -> Result<Note, ClientError> {
        let request = self
            .request(Method::POST, "notes")?
            .json(&json!({ "title": title }));
        Ok(Self::send(request).await?.json().await?)
    }

    pub async fn get_note(&self, id: &NoteID) -> Result<Note, ClientError> {
        let request = self.request(Method::GET, &format!("notes/{}", id))?;
        Ok(Self::send(request).await?.json().await?)
    }

    pub async fn update_note(&self, id: &NoteID, title: &str) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &format!("notes/{}", id))?
            .json(&json!({ "title": title }));
        Self::send(request).await?;
        Ok(())
    }

    pub async fn delete_note(&self, id: &NoteID) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &format!("notes/{}", id))?;
        Self::send(request).await?;
        Ok(())
    }

    pub async fn get_note_content(&self, id: &NoteID) -> Result<Vec<u8>, ClientError> {
        let request = self.request(Method::GET, &format!("notes/{}/content", id))?;
        Ok(Self::send(request).await?.bytes().await?.to_vec())
    }

    /// Upload the content as the `content` field of a multipart form.
    pub async fn update_note_content(
        &self,
        id: &NoteID,
        content: Vec<u8>,
    ) -> Result<(), ClientError> {
        let form = Form::new().part(CONTENT_FIELD, Part::bytes(content));
        let request = self
            .request(Method::POST, &format!("notes/{}/content", id))?
            .multipart(form);
        Self::send(request).await?;
        Ok(())
    }
}
