use std::collections::BTreeMap;

use bson::{Bson, doc};

use aegis_storage::{bulk, bulk::AclUpdate, store::Store};
use aegis_testkit::TestCollection;

#[tokio::test]
#[ignore = "Requires external MongoDB. Set AEGIS_MONGODB_URI to run."]
async fn bulk_acl_assignment_replaces_attribute_sets() {
	let Some(uri) = aegis_testkit::env_mongo_uri() else {
		eprintln!(
			"Skipping bulk_acl_assignment_replaces_attribute_sets; set AEGIS_MONGODB_URI to run this test."
		);

		return;
	};
	let test = TestCollection::new(&uri, "bulk_acl").await.expect("Failed to build test collection.");
	let collection = test.collection();

	collection
		.insert_many(vec![
			doc! { "_id": 1_i32, "fullplot": "first" },
			doc! { "_id": 2_i32, "fullplot": "second" },
		])
		.await
		.expect("Failed to seed documents.");

	let cfg = aegis_config::Mongo {
		uri: uri.clone(),
		database: test.database().to_string(),
		collection: test.name().to_string(),
	};
	let store = Store::connect(&cfg).await.expect("Failed to connect store.");
	let updates = vec![
		AclUpdate {
			id: Bson::Int32(1),
			sets: BTreeMap::from([
				("ACL1".to_string(), vec![17, 556, 999]),
				("ACL2".to_string(), vec![83]),
			]),
		},
		AclUpdate {
			id: Bson::Int32(2),
			sets: BTreeMap::from([("ACL1".to_string(), Vec::new())]),
		},
	];
	let modified = bulk::assign_acl_batch(&store, &updates).await.expect("Bulk write failed.");

	assert_eq!(modified, 2);

	let first = collection
		.find_one(doc! { "_id": 1_i32 })
		.await
		.expect("Failed to read document.")
		.expect("Document 1 must exist.");
	let acl1: Vec<i32> = first
		.get_array("ACL1")
		.expect("ACL1 must be an array.")
		.iter()
		.map(|value| value.as_i32().expect("ACL values must be i32."))
		.collect();

	assert_eq!(acl1, vec![17, 556, 999]);

	let second = collection
		.find_one(doc! { "_id": 2_i32 })
		.await
		.expect("Failed to read document.")
		.expect("Document 2 must exist.");

	assert!(second.get_array("ACL1").expect("ACL1 must be an array.").is_empty());

	test.cleanup().await.expect("Failed to clean up test collection.");
}
