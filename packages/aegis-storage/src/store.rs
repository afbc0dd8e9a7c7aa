use bson::Document;
use futures::TryStreamExt;
use mongodb::{Client, Collection, Namespace};

use crate::Result;

/// Handle to the document corpus. Connections are established lazily by the
/// driver; constructing a store performs no I/O beyond URI parsing.
pub struct Store {
	pub client: Client,
	pub database: String,
	pub collection: String,
}
impl Store {
	pub async fn connect(cfg: &aegis_config::Mongo) -> Result<Self> {
		let client = Client::with_uri_str(&cfg.uri).await?;

		Ok(Self {
			client,
			database: cfg.database.clone(),
			collection: cfg.collection.clone(),
		})
	}

	pub fn documents(&self) -> Collection<Document> {
		self.client.database(&self.database).collection(&self.collection)
	}

	pub fn namespace(&self) -> Namespace {
		Namespace { db: self.database.clone(), coll: self.collection.clone() }
	}

	pub async fn count_documents(&self) -> Result<u64> {
		Ok(self.documents().count_documents(bson::doc! {}).await?)
	}

	/// Runs a staged pipeline and collects the result set.
	pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
		let mut cursor = self.documents().aggregate(pipeline).await?;
		let mut out = Vec::new();

		while let Some(document) = cursor.try_next().await? {
			out.push(document);
		}

		Ok(out)
	}
}
