mod error;

pub use error::{Error, Result};

use std::env;

use bson::Document;
use mongodb::{Client, Collection};
use uuid::Uuid;

const TEST_DATABASE: &str = "aegis_test";

/// A uniquely named collection inside the shared test database. Call
/// [`TestCollection::cleanup`] at the end of the test; tests that panic leave
/// the collection behind for inspection under the `aegis_test` database.
pub struct TestCollection {
	client: Client,
	name: String,
	cleaned: bool,
}
impl TestCollection {
	pub async fn new(uri: &str, prefix: &str) -> Result<Self> {
		let client = Client::with_uri_str(uri)
			.await
			.map_err(|err| Error::Message(format!("Failed to parse AEGIS_MONGODB_URI: {err}.")))?;
		let name = format!("{prefix}_{}", Uuid::new_v4().simple());

		Ok(Self { client, name, cleaned: false })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn database(&self) -> &str {
		TEST_DATABASE
	}

	pub fn collection(&self) -> Collection<Document> {
		self.client.database(TEST_DATABASE).collection(&self.name)
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.collection().drop().await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestCollection {
	fn drop(&mut self) {
		if !self.cleaned {
			eprintln!(
				"Test collection {}.{} was not cleaned up; drop it manually.",
				TEST_DATABASE, self.name
			);
		}
	}
}

pub fn env_mongo_uri() -> Option<String> {
	env::var("AEGIS_MONGODB_URI").ok()
}
