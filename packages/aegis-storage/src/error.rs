#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Mongo(#[from] mongodb::error::Error),
}
