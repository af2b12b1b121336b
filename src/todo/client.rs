use crate::config::Config;
use crate::todo::types::{NewTodo, Todo, TodoPatch};
use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use reqwest::{Method, RequestBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Remote todo resource.
///
/// The cache talks to the resource through this trait so it can be driven by
/// an in-memory fake in tests.
pub trait TodoApi: Send + Sync {
  /// `GET /todos`
  fn list(&self) -> BoxFuture<'_, Result<Vec<Todo>>>;

  /// `POST /todos`
  fn create(&self, todo: NewTodo) -> BoxFuture<'_, Result<Todo>>;

  /// `PUT /todos/{id}` with only the changed fields
  fn update(&self, id: String, fields: TodoPatch) -> BoxFuture<'_, Result<Todo>>;

  /// `DELETE /todos/{id}`
  fn delete(&self, id: String) -> BoxFuture<'_, Result<()>>;
}

/// HTTP client for the todo resource
#[derive(Clone)]
pub struct TodoClient {
  http: reqwest::Client,
  base: Url,
}

impl TodoClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.api.url, e))?;

    if base.cannot_be_a_base() {
      return Err(eyre!("API url {} cannot be used as a base url", base));
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("todo-tui/", env!("CARGO_PKG_VERSION")))
      .connect_timeout(Duration::from_secs(config.api.connect_timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  /// The collection url, e.g. `https://host/api/v1/todos`
  pub fn base_url(&self) -> &Url {
    &self.base
  }

  /// Url of a single item: the collection url with the id appended as a path segment
  fn item_url(&self, id: &str) -> Result<Url> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| eyre!("API url {} cannot be used as a base url", self.base))?
      .pop_if_empty()
      .push(id);
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    debug!(%method, %url, "todo api request");
    self.http.request(method, url)
  }

  /// Fetch all todos in server order
  pub async fn list_todos(&self) -> Result<Vec<Todo>> {
    let response = self
      .request(Method::GET, self.base.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch todos: {}", e))?
      .error_for_status()
      .map_err(|e| eyre!("Failed to fetch todos: {}", e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse todos: {}", e))
  }

  /// Create a todo; the server assigns the id
  pub async fn create_todo(&self, todo: &NewTodo) -> Result<Todo> {
    let response = self
      .request(Method::POST, self.base.clone())
      .json(todo)
      .send()
      .await
      .map_err(|e| eyre!("Failed to create todo: {}", e))?
      .error_for_status()
      .map_err(|e| eyre!("Failed to create todo: {}", e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse created todo: {}", e))
  }

  /// Send the changed fields of a todo
  pub async fn update_todo(&self, id: &str, fields: &TodoPatch) -> Result<Todo> {
    let response = self
      .request(Method::PUT, self.item_url(id)?)
      .json(fields)
      .send()
      .await
      .map_err(|e| eyre!("Failed to update todo {}: {}", id, e))?
      .error_for_status()
      .map_err(|e| eyre!("Failed to update todo {}: {}", id, e))?;

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse updated todo {}: {}", id, e))
  }

  /// Delete a todo. Any 2xx response counts as success, whatever its body.
  pub async fn delete_todo(&self, id: &str) -> Result<()> {
    self
      .request(Method::DELETE, self.item_url(id)?)
      .send()
      .await
      .map_err(|e| eyre!("Failed to delete todo {}: {}", id, e))?
      .error_for_status()
      .map_err(|e| eyre!("Failed to delete todo {}: {}", id, e))?;

    Ok(())
  }
}

impl TodoApi for TodoClient {
  fn list(&self) -> BoxFuture<'_, Result<Vec<Todo>>> {
    Box::pin(self.list_todos())
  }

  fn create(&self, todo: NewTodo) -> BoxFuture<'_, Result<Todo>> {
    Box::pin(async move { self.create_todo(&todo).await })
  }

  fn update(&self, id: String, fields: TodoPatch) -> BoxFuture<'_, Result<Todo>> {
    Box::pin(async move { self.update_todo(&id, &fields).await })
  }

  fn delete(&self, id: String) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move { self.delete_todo(&id).await })
  }
}
