//! End-to-end tests of the recursive modeler on the shop dataset:
//! `customers <- orders <- items`, with 2 customers, customer 1 owning two
//! orders of 3 and 1 items and customer 2 owning none.

use cpakit_core::error::CpaError;
use cpakit_core::model::{ModelConfig, ModelError, ModelKind};
use cpakit_core::modeler::{child_rows_column, Modeler};
use cpakit_core::report::{read_report, write_report, ModelReport};
use cpakit_core::schema::load::read_csv_table;
use cpakit_core::schema::types::{FieldType, MetadataDocument, TableMeta};
use cpakit_core::schema::{Metadata, MetadataProvider};
use cpakit_core::table::{Column, Frame, Key, Tables};
use cpakit_testutil::{shop, shop_metadata, shop_tables, write_shop_dataset, RecordingFactory};

fn independent() -> ModelConfig {
    ModelConfig::new(ModelKind::Independent)
}

#[test]
fn test_customers_extended_with_orders() {
    let tables = shop_tables();
    let mut modeler = Modeler::new(shop(), independent());
    let customers = modeler.cpa("customers", Some(&tables), None).unwrap();

    assert_eq!(customers.len(), 2);
    assert_eq!(
        customers.keys("id").unwrap(),
        &[Some(Key::Int(1)), Some(Key::Int(2))]
    );
    assert_eq!(
        customers.numeric("__orders__child_rows").unwrap(),
        &[Some(2.0), Some(0.0)]
    );

    // Every other orders column is missing for the customer without orders.
    let order_columns: Vec<&str> = customers
        .column_names()
        .filter(|c| c.starts_with("__orders__") && *c != "__orders__child_rows")
        .collect();
    assert!(!order_columns.is_empty());
    for column in order_columns {
        let cells = customers.numeric(column).unwrap();
        assert!(cells[0].is_some(), "{} should be set for customer 1", column);
        assert!(cells[1].is_none(), "{} should be missing for customer 2", column);
    }

    assert_eq!(
        customers.numeric("__orders__distribs__total__loc").unwrap()[0],
        Some(32.5)
    );
    // Items per order (3 and 1), aggregated a second time per customer.
    assert_eq!(
        customers
            .numeric("__orders__distribs____items__child_rows__loc")
            .unwrap()[0],
        Some(2.0)
    );
}

/// Shop dataset plus order 12 for customer 2, which has no items.
fn shop_tables_with_empty_order() -> Tables {
    let mut tables = shop_tables();
    let meta = shop_metadata();
    let orders = read_csv_table(
        meta.table("orders").unwrap(),
        "id,customer_id,total,express,placed_at\n\
         10,1,25.0,true,2024-03-01\n\
         11,1,40.0,false,2024-03-09\n\
         12,2,18.0,false,2024-04-02\n"
            .as_bytes(),
    )
    .unwrap();
    tables.insert("orders".to_string(), orders);
    tables
}

#[test]
fn test_order_without_items_aggregates_to_gaps() {
    let tables = shop_tables_with_empty_order();

    for config in [ModelConfig::default(), independent()] {
        let mut modeler = Modeler::new(shop(), config);
        modeler.model_database(Some(&tables)).unwrap();
        assert_eq!(modeler.models().len(), 3);

        let customers = modeler.cpa("customers", Some(&tables), None).unwrap();
        assert_eq!(
            customers.numeric("__orders__child_rows").unwrap(),
            &[Some(2.0), Some(1.0)]
        );
        assert_eq!(
            customers.numeric("__orders__distribs__total__loc").unwrap()[1],
            Some(18.0)
        );
        // Order 12 has child_rows 0 for items, which is an observed value.
        assert_eq!(
            customers
                .numeric("__orders__distribs____items__child_rows__loc")
                .unwrap()[1],
            Some(0.0)
        );
        // Its item parameters are missing, so customer 2 gets no marginal for them.
        let price = customers
            .numeric("__orders__distribs____items__distribs__price__loc__loc")
            .unwrap();
        assert!(price[0].is_some());
        assert!(price[1].is_none());
    }
}

#[test]
fn test_tables_fitted_children_first() {
    let tables = shop_tables();
    let factory = RecordingFactory::new(independent());
    let mut modeler = Modeler::new(shop(), &factory);
    modeler.model_database(Some(&tables)).unwrap();

    assert_eq!(
        modeler.models().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["items", "orders", "customers"]
    );

    let fits = factory.fits();
    let last_items = fits.iter().rposition(|f| f.table == "items").unwrap();
    let orders_full = fits
        .iter()
        .position(|f| f.table == "orders" && f.rows == 2 && f.columns.contains(&child_rows_column("items")))
        .unwrap();
    let customers_full = fits.iter().position(|f| f.table == "customers").unwrap();
    assert!(last_items < orders_full);
    assert!(orders_full < customers_full);

    // items: 1 table model + 2 orders; orders: 1 table model + 1 customer.
    let counts = factory.fit_counts();
    assert_eq!(counts["items"], 3);
    assert_eq!(counts["orders"], 2);
    assert_eq!(counts["customers"], 1);

    // Sub-models never see identifiers.
    for fit in &fits {
        assert!(!fit.columns.iter().any(|c| c == "id" || c.ends_with("_id")));
    }
}

#[test]
fn test_table_sizes_are_raw_row_counts() {
    let tables = shop_tables();
    let mut modeler = Modeler::new(shop(), independent());
    modeler.model_database(Some(&tables)).unwrap();

    let sizes: Vec<(&str, usize)> = modeler
        .table_sizes()
        .iter()
        .map(|(t, n)| (t.as_str(), *n))
        .collect();
    assert_eq!(sizes, vec![("customers", 2), ("orders", 2), ("items", 4)]);
}

#[test]
fn test_repeated_modeling_is_idempotent() {
    let tables = shop_tables();

    let mut first = Modeler::new(shop(), ModelConfig::default());
    let mut second = Modeler::new(shop(), ModelConfig::default());
    let a = first.cpa("customers", Some(&tables), None).unwrap();
    let b = second.cpa("customers", Some(&tables), None).unwrap();
    assert_eq!(a, b);
    assert_eq!(first.parameters().unwrap(), second.parameters().unwrap());

    let again = first.cpa("customers", Some(&tables), None).unwrap();
    assert_eq!(a, again);
    assert_eq!(first.models().len(), 3);
    assert_eq!(tables, shop_tables());
}

#[test]
fn test_child_call_carries_foreign_key() {
    let tables = shop_tables();
    let mut modeler = Modeler::new(shop(), independent());
    let orders = modeler.cpa("orders", Some(&tables), Some("customer_id")).unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(
        orders.keys("customer_id").unwrap(),
        &[Some(Key::Int(1)), Some(Key::Int(1))]
    );
    assert_eq!(
        orders.numeric("__items__child_rows").unwrap(),
        &[Some(3.0), Some(1.0)]
    );
}

fn items_frame(order_ids: &[i64]) -> Frame {
    let mut frame = Frame::new("items", order_ids.len());
    frame
        .push_column(
            "id",
            Column::Keys((0..order_ids.len() as i64).map(|i| Some(Key::Int(i))).collect()),
        )
        .unwrap();
    frame
        .push_column(
            "price",
            Column::Numeric(order_ids.iter().map(|&o| Some(o as f64 * 2.0)).collect()),
        )
        .unwrap();
    frame
        .push_column(
            "order_id",
            Column::Keys(order_ids.iter().map(|&o| Some(Key::Int(o))).collect()),
        )
        .unwrap();
    frame
}

#[test]
fn test_extension_has_one_row_per_distinct_key() {
    let modeler = Modeler::new(shop(), independent());

    let extension = modeler
        .build_extension("items", &items_frame(&[5, 3, 5, 1, 2, 4, 3]), "order_id")
        .unwrap();
    let index = extension.index().unwrap();
    assert_eq!(index.name, "order_id");
    assert_eq!(
        index.keys,
        vec![Key::Int(5), Key::Int(3), Key::Int(1), Key::Int(2), Key::Int(4)]
    );
    assert_eq!(
        extension.numeric("__items__child_rows").unwrap(),
        &[Some(2.0), Some(2.0), Some(1.0), Some(1.0), Some(1.0)]
    );
    assert_eq!(
        extension.column_names().collect::<Vec<_>>(),
        vec![
            "__items__distribs__price__loc",
            "__items__distribs__price__scale",
            "__items__child_rows",
        ]
    );

    let shuffled = modeler
        .build_extension("items", &items_frame(&[4, 3, 2, 1, 5, 3, 5]), "order_id")
        .unwrap();
    let mut keys = shuffled.index().unwrap().keys.clone();
    keys.sort();
    assert_eq!(
        keys,
        vec![Key::Int(1), Key::Int(2), Key::Int(3), Key::Int(4), Key::Int(5)]
    );
}

#[test]
fn test_model_from_disk_matches_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shop_dataset(dir.path());

    let mut from_disk = Modeler::new(Metadata::load(&path).unwrap(), ModelConfig::default());
    from_disk.model_database(None).unwrap();

    let tables = shop_tables();
    let mut in_memory = Modeler::new(shop(), ModelConfig::default());
    in_memory.model_database(Some(&tables)).unwrap();

    assert_eq!(from_disk.table_sizes(), in_memory.table_sizes());
    assert_eq!(from_disk.parameters().unwrap(), in_memory.parameters().unwrap());

    // An empty table map falls back to loading.
    let mut fallback = Modeler::new(Metadata::load(&path).unwrap(), ModelConfig::default());
    fallback
        .model_database(Some(&Default::default()))
        .unwrap();
    assert_eq!(fallback.parameters().unwrap(), in_memory.parameters().unwrap());
}

#[test]
fn test_report_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let tables = shop_tables();
    let config = ModelConfig::default();
    let mut modeler = Modeler::new(shop(), config.clone());
    modeler.model_database(Some(&tables)).unwrap();

    let report = ModelReport::from_modeler(&modeler, &config).unwrap();
    assert_eq!(
        report.parameters.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["items", "orders", "customers"]
    );
    assert!(!report.is_stale(&shop_metadata()));

    let path = dir.path().join("report.json");
    write_report(&report, &path).unwrap();
    assert_eq!(read_report(&path).unwrap(), report);
}

#[test]
fn test_empty_child_table_fails_fit() {
    let mut tables = shop_tables();
    let meta = shop_metadata();
    let items = read_csv_table(
        meta.table("items").unwrap(),
        "id,order_id,price,quantity\n".as_bytes(),
    )
    .unwrap();
    tables.insert("items".to_string(), items);

    let mut modeler = Modeler::new(shop(), independent());
    let err = modeler.model_database(Some(&tables)).unwrap_err();
    match err {
        CpaError::Fit {
            table,
            foreign_key_value,
            source,
        } => {
            assert_eq!(table, "items");
            assert_eq!(foreign_key_value, None);
            assert_eq!(source, ModelError::EmptyTable);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(modeler.models().is_empty());
    assert_eq!(modeler.table_sizes()["items"], 0);
}

#[test]
fn test_mismatched_key_types_fail_merge() {
    let document = MetadataDocument {
        tables: vec![
            TableMeta::new("users")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("age", FieldType::integer()),
            TableMeta::new("posts")
                .with_field(
                    "user_id",
                    FieldType::Id {
                        subtype: cpakit_core::schema::types::IdSubtype::String,
                        reference: Some(cpakit_core::schema::types::FieldRef {
                            table: "users".to_string(),
                            field: "id".to_string(),
                        }),
                    },
                )
                .with_field("words", FieldType::integer()),
        ],
    };
    let metadata = Metadata::new(document.clone(), ".").unwrap();
    let tables: Tables = document
        .tables
        .iter()
        .zip(["id,age\n1,20\n2,30\n", "user_id,words\nu1,100\nu2,250\n"])
        .map(|(meta, csv)| (meta.name.clone(), read_csv_table(meta, csv.as_bytes()).unwrap()))
        .collect();

    let mut modeler = Modeler::new(metadata, independent());
    let err = modeler.cpa("users", Some(&tables), None).unwrap_err();
    assert!(matches!(err, CpaError::DataShape { .. }), "{}", err);
}

#[test]
fn test_table_without_primary_key_has_no_children_modeled() {
    let document = MetadataDocument {
        tables: vec![
            TableMeta::new("logs")
                .with_field("id", FieldType::id())
                .with_field("level", FieldType::integer()),
            TableMeta::new("log_lines")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("log_id", FieldType::foreign_key("logs", "id"))
                .with_field("length", FieldType::integer()),
        ],
    };
    let metadata = Metadata::new(document.clone(), ".").unwrap();
    assert_eq!(metadata.get_children("logs").unwrap(), vec!["log_lines"]);

    let tables: Tables = document
        .tables
        .iter()
        .zip(["id,level\n1,3\n2,5\n", "id,log_id,length\n1,1,80\n2,1,12\n"])
        .map(|(meta, csv)| (meta.name.clone(), read_csv_table(meta, csv.as_bytes()).unwrap()))
        .collect();

    let mut modeler = Modeler::new(metadata, independent());
    assert_eq!(modeler.planned_tables().unwrap(), vec!["logs"]);
    modeler.model_database(Some(&tables)).unwrap();

    assert_eq!(
        modeler.models().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["logs"]
    );
    assert!(!modeler.table_sizes().contains_key("log_lines"));
}
