#[path = "helpers.rs"]
mod helpers;

mod loader_tests {
    use std::sync::Arc;

    use nodestat::{FetchStrategy, SeaOrmDriver, StatError, StatisticsClient, StorageDriver};
    use serde_json::{json, Value};

    use crate::helpers::*;

    fn by_participant<'a>(
        stats: &'a [nodestat::Statistic],
        participant: i64,
    ) -> &'a nodestat::Statistic {
        stats
            .iter()
            .find(|s| s.get("participant") == Some(&json!(participant)))
            .expect("statistic for participant")
    }

    #[tokio::test]
    async fn test_load_all_by_alias() {
        init_logger();
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        let stats = client.load_all("Stats Achilles").await.unwrap();
        assert_eq!(stats.len(), 2);

        let morning = by_participant(&stats, 100);
        assert_eq!(morning.entity_type(), "sports_statistic");
        assert_eq!(morning.get("event"), Some(&json!(200)));
        assert_eq!(morning.get("minutes"), Some(&json!(30)));
        assert_eq!(morning.get("hours"), Some(&json!(1)));
        assert_eq!(morning.get("seconds"), Some(&json!(15)));
        assert_eq!(morning.get("distanceInMiles"), Some(&json!(6.5)));

        // no distance row for the evening ride
        let evening = by_participant(&stats, 101);
        assert_eq!(evening.get("minutes"), Some(&json!(45)));
        assert_eq!(evening.get("distanceInMiles"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_alias_and_entity_type_load_the_same_rows() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        let by_alias = client.load_all("Stats Achilles").await.unwrap();
        let by_type = client.load_all("sports_statistic").await.unwrap();
        assert_eq!(by_alias.len(), by_type.len());
        for stat in &by_alias {
            let participant = stat.get("participant").and_then(Value::as_i64).unwrap();
            assert_eq!(stat, by_participant(&by_type, participant));
        }
    }

    #[tokio::test]
    async fn test_properties_follow_schema_order() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        let stats = client.load_by_ids("Stats Achilles", &[1]).await.unwrap();
        assert_eq!(stats.len(), 1);
        let names: Vec<&str> = stats[0].properties().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            ["participant", "event", "minutes", "hours", "seconds", "distanceInMiles"]
        );
    }

    #[tokio::test]
    async fn test_load_by_ids_restricts_rows() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        let stats = client.load_by_ids("sports_statistic", &[2, 99]).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].get("participant"), Some(&json!(101)));

        // ids of another type do not leak in
        let stats = client.load_by_ids("sports_statistic", &[10, 11]).await.unwrap();
        assert!(stats.is_empty());

        let stats = client.load_by_ids("sports_statistic", &[]).await.unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn test_goalball_teams_in_reference_order() {
        init_logger();
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        let stats = client.load_all("Stats Goalball Tournament").await.unwrap();
        assert_eq!(stats.len(), 2);
        for stat in &stats {
            assert_eq!(stat.entity_type(), "goalball_score_board");
            assert_eq!(stat.len(), 1);
        }

        let teams: Vec<&Value> = stats.iter().filter_map(|s| s.get("goalballTeam")).collect();
        assert!(teams.contains(&&json!([
            { "id": 11, "title": "Bats" },
            { "id": 10, "title": "Owls" }
        ])));
        assert!(teams.contains(&&json!([])));
    }

    #[tokio::test]
    async fn test_load_all_spans_several_id_batches() {
        let db = setup_test_db().await.unwrap();
        seed_bulk_statistics(&db, 2500).await.unwrap();
        let client = StatisticsClient::new(db);

        let stats = client.load_all("Stats Achilles").await.unwrap();
        assert_eq!(stats.len(), 2502);
        assert!(stats.iter().all(|s| s.get("minutes").is_some_and(|v| v.is_i64())));

        let ids: Vec<i64> = (1000..3500).collect();
        let stats = client.load_by_ids("sports_statistic", &ids).await.unwrap();
        assert_eq!(stats.len(), 2500);
        assert!(stats.iter().all(|s| s.get("participant") == Some(&Value::Null)));
    }

    #[tokio::test]
    async fn test_single_id_batches_keep_reference_order() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::with_parts(
            Arc::new(nodestat::TypeRegistry::standard()),
            nodestat::FetchTable::standard(),
            Arc::new(SeaOrmDriver::new(db).with_batch_size(1)),
        );

        let stats = client.load_all("Stats Goalball Tournament").await.unwrap();
        let teams: Vec<&Value> = stats.iter().filter_map(|s| s.get("goalballTeam")).collect();
        assert!(teams.contains(&&json!([
            { "id": 11, "title": "Bats" },
            { "id": 10, "title": "Owls" }
        ])));

        let stats = client.load_by_ids("Stats Achilles", &[2, 1, 2]).await.unwrap();
        assert_eq!(stats.len(), 2);
    }

    #[tokio::test]
    async fn test_types_without_rows_load_empty() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        assert!(client.load_all("Stats Cycling").await.unwrap().is_empty());
        assert!(client.load_all("Stats Health Check").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_type_without_properties_yields_empty_statistics() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        let stats = client.load_all("Stats Bowling").await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].entity_type(), "bowling_scores");
        assert!(stats[0].is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_never_reaches_storage() {
        let driver = Arc::new(MemoryDriver::default());
        let client = StatisticsClient::with_parts(
            Arc::new(nodestat::TypeRegistry::standard()),
            nodestat::FetchTable::standard(),
            driver.clone(),
        );

        let err = client.load_all("Stats Curling").await.unwrap_err();
        assert!(matches!(err, StatError::UnknownType { ref name } if name == "Stats Curling"));
        assert!(!err.is_recoverable());
        assert_eq!(driver.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_tables_surface_as_storage_errors() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let client = StatisticsClient::new(db);

        let err = client.load_all("Stats Achilles").await.unwrap_err();
        assert!(matches!(err, StatError::Storage { .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_driver_failure_is_propagated() {
        let client = StatisticsClient::with_parts(
            Arc::new(nodestat::TypeRegistry::standard()),
            nodestat::FetchTable::standard(),
            Arc::new(MemoryDriver::failing()),
        );
        let err = client.load_all("Stats Achilles").await.unwrap_err();
        assert!(matches!(err, StatError::Storage { ref operation, .. } if operation == "fetch"));
    }

    #[tokio::test]
    async fn test_materialized_values_match_their_strategies() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db.clone());
        let driver = SeaOrmDriver::new(db);
        let materializer = client.materializer();
        let ctx = materializer.context().clone();

        let entity_types: Vec<String> = ctx.registry.entity_types().map(str::to_string).collect();
        for entity_type in entity_types {
            let definition = nodestat::relation::build(&ctx.registry, &entity_type).unwrap();
            let rows = driver.fetch(&definition).await.unwrap();
            let schema = ctx.registry.schema_for(&entity_type).unwrap();

            for row in rows {
                let row = Arc::new(row);
                let stat = materializer
                    .materialize(&entity_type, row.clone())
                    .await
                    .unwrap();
                for property in schema.materialized() {
                    let expected = match ctx.fetch_table.strategy(property).unwrap() {
                        FetchStrategy::Sync(fetch) => fetch(&row, property, &ctx.registry).unwrap(),
                        FetchStrategy::Async(fetch) => {
                            fetch(ctx.clone(), row.clone(), property.clone()).await.unwrap()
                        }
                    };
                    assert_eq!(stat.get(property), Some(&expected), "{entity_type}.{property}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_statistic_serializes_with_its_type() {
        let db = setup_test_db().await.unwrap();
        let client = StatisticsClient::new(db);

        let stats = client.load_by_ids("Stats Achilles", &[1]).await.unwrap();
        let payload = serde_json::to_value(&stats[0]).unwrap();
        assert_eq!(payload["type"], json!("sports_statistic"));
        assert_eq!(payload["properties"]["minutes"], json!(30));
        assert_eq!(payload["properties"], stats[0].to_json());
    }
}
