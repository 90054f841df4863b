use super::ApiClient;
use crate::error::RemoteError;
use crate::models::{Note, NoteId, NoteRow};
use crate::notes::NoteRemote;
use serde::Serialize;

const NOTES_PATH: &str = "/rest/v1/notes";

#[derive(Serialize)]
struct NewNote<'a> {
    content: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct ContentPatch<'a> {
    content: &'a str,
}

fn eq_filter(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

impl ApiClient {
    fn row_url(&self, id: &NoteId) -> String {
        format!("{}?id={}", self.url(NOTES_PATH), eq_filter(id.as_str()))
    }
}

impl NoteRemote for ApiClient {
    async fn fetch_notes(&self, user_id: &str) -> Result<Vec<Note>, RemoteError> {
        log::debug!("api: fetching notes for {user_id}");
        let url = format!(
            "{}?select=*&user_id={}&order=created_at.desc",
            self.url(NOTES_PATH),
            eq_filter(user_id)
        );
        let rows: Vec<NoteRow> = self
            .send_rest(self.http.get(url))
            .await?
            .json()
            .await
            .map_err(RemoteError::malformed)?;

        rows.into_iter().map(Note::try_from).collect()
    }

    async fn insert_note(&self, user_id: &str, content: &str) -> Result<(), RemoteError> {
        let req = self
            .http
            .post(self.url(NOTES_PATH))
            .header("Prefer", "return=minimal")
            .json(&[NewNote { content, user_id }]);
        self.send_rest(req).await?;
        Ok(())
    }

    async fn update_note(&self, id: &NoteId, content: &str) -> Result<(), RemoteError> {
        let req = self.http.patch(self.row_url(id)).json(&ContentPatch { content });
        self.send_rest(req).await?;
        Ok(())
    }

    async fn delete_note(&self, id: &NoteId) -> Result<(), RemoteError> {
        self.send_rest(self.http.delete(self.row_url(id))).await?;
        Ok(())
    }
}
