//! Shared fixtures for cpakit tests and benches.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use cpakit_core::model::{ModelConfig, ModelError, ModelFactory, Parameters, TableModel};
use cpakit_core::schema::load::read_csv_table;
use cpakit_core::schema::types::{FieldType, MetadataDocument, TableMeta};
use cpakit_core::schema::Metadata;
use cpakit_core::table::{Frame, Tables};

const CUSTOMERS_CSV: &str = "\
id,age,segment
1,34,retail
2,51,b2b
";

const ORDERS_CSV: &str = "\
id,customer_id,total,express,placed_at
10,1,25.0,true,2024-03-01
11,1,40.0,false,2024-03-09
";

const ITEMS_CSV: &str = "\
id,order_id,price,quantity
100,10,5.0,1
101,10,7.5,2
102,10,12.5,1
103,11,3.0,4
";

/// `customers(id) <- orders(customer_id) <- items(order_id)`.
pub fn shop_metadata() -> MetadataDocument {
    MetadataDocument {
        tables: vec![
            TableMeta::new("customers")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("age", FieldType::integer())
                .with_field("segment", FieldType::Categorical),
            TableMeta::new("orders")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("customer_id", FieldType::foreign_key("customers", "id"))
                .with_field("total", FieldType::float())
                .with_field("express", FieldType::Boolean)
                .with_field("placed_at", FieldType::Datetime { format: None }),
            TableMeta::new("items")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("order_id", FieldType::foreign_key("orders", "id"))
                .with_field("price", FieldType::float())
                .with_field("quantity", FieldType::integer()),
        ],
    }
}

fn shop_csv(table: &str) -> &'static str {
    match table {
        "customers" => CUSTOMERS_CSV,
        "orders" => ORDERS_CSV,
        "items" => ITEMS_CSV,
        other => panic!("no fixture data for table '{}'", other),
    }
}

/// Two customers; customer 1 has two orders with 3 and 1 items, customer 2
/// has none.
pub fn shop_tables() -> Tables {
    shop_metadata()
        .tables
        .iter()
        .map(|meta| {
            let raw = read_csv_table(meta, shop_csv(&meta.name).as_bytes())
                .expect("fixture CSV should load");
            (meta.name.clone(), raw)
        })
        .collect()
}

/// In-memory metadata for the shop dataset; tables must be supplied.
pub fn shop() -> Metadata {
    Metadata::new(shop_metadata(), ".").expect("fixture metadata should validate")
}

/// Write the shop dataset (metadata.json plus one CSV per table) to `dir`
/// and return the metadata path.
pub fn write_shop_dataset(dir: &Path) -> PathBuf {
    let metadata = shop_metadata();
    for table in &metadata.tables {
        std::fs::write(dir.join(table.data_path()), shop_csv(&table.name))
            .expect("write fixture CSV");
    }
    let path = dir.join("metadata.json");
    std::fs::write(
        &path,
        serde_json::to_string_pretty(&metadata).expect("serialize fixture metadata"),
    )
    .expect("write fixture metadata");
    path
}

/// Two-level dataset with `parents` roots and `children_per_parent` child
/// rows each, for benchmarks.
pub fn wide_dataset(parents: usize, children_per_parent: usize) -> (Metadata, Tables) {
    let document = MetadataDocument {
        tables: vec![
            TableMeta::new("accounts")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("balance", FieldType::float()),
            TableMeta::new("events")
                .with_primary_key("id")
                .with_field("id", FieldType::id())
                .with_field("account_id", FieldType::foreign_key("accounts", "id"))
                .with_field("amount", FieldType::float())
                .with_field("duration", FieldType::float()),
        ],
    };

    let mut accounts = String::from("id,balance\n");
    let mut events = String::from("id,account_id,amount,duration\n");
    for p in 0..parents {
        accounts.push_str(&format!("{},{}\n", p, (p * 37 % 1000) as f64 / 10.0));
        for c in 0..children_per_parent {
            let id = p * children_per_parent + c;
            events.push_str(&format!(
                "{},{},{},{}\n",
                id,
                p,
                (id * 13 % 97) as f64,
                ((id * 7 + p) % 31) as f64 / 3.0
            ));
        }
    }

    let mut tables = Tables::new();
    for (meta, csv) in document.tables.iter().zip([accounts, events]) {
        let raw = read_csv_table(meta, csv.as_bytes()).expect("generated CSV should load");
        tables.insert(meta.name.clone(), raw);
    }
    let metadata = Metadata::new(document, ".").expect("generated metadata should validate");
    (metadata, tables)
}

/// What a model saw when it was fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRecord {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Model factory that records every fit, in order, then delegates to the
/// model `config` would build.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    config: ModelConfig,
    fits: Rc<RefCell<Vec<FitRecord>>>,
}

impl RecordingFactory {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            fits: Rc::default(),
        }
    }

    pub fn fits(&self) -> Vec<FitRecord> {
        self.fits.borrow().clone()
    }

    /// Fits per table name, counting both full-table and per-parent fits.
    pub fn fit_counts(&self) -> IndexMap<String, usize> {
        let mut counts = IndexMap::new();
        for fit in self.fits.borrow().iter() {
            *counts.entry(fit.table.clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl ModelFactory for RecordingFactory {
    fn build(&self) -> cpakit_core::Result<Box<dyn TableModel>> {
        Ok(Box::new(RecordingModel {
            inner: self.config.build()?,
            fits: Rc::clone(&self.fits),
        }))
    }
}

#[derive(Debug)]
struct RecordingModel {
    inner: Box<dyn TableModel>,
    fits: Rc<RefCell<Vec<FitRecord>>>,
}

impl TableModel for RecordingModel {
    fn fit(&mut self, table: &Frame) -> Result<(), ModelError> {
        self.fits.borrow_mut().push(FitRecord {
            table: table.table().to_string(),
            rows: table.len(),
            columns: table.column_names().map(String::from).collect(),
        });
        self.inner.fit(table)
    }

    fn get_parameters(&self) -> Result<Parameters, ModelError> {
        self.inner.get_parameters()
    }
}
