//! End-to-end pipeline runs

use super::{pipeline_config, warehouse_path, write_source};
use crate::pipeline::Pipeline;
use crate::sink::SqliteSink;
use rusqlite::types::Value;
use tempfile::TempDir;

fn column_names(sink: &SqliteSink, table: &str) -> Vec<String> {
    sink.table_schema(table)
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

fn real(value: &Value) -> f64 {
    match value {
        Value::Real(v) => *v,
        other => panic!("Expected REAL value, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sales_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(
        &temp_dir,
        "sales.csv",
        "ID,Price,Quantity\n1,10,2\n2,,3\n1,10,2\n",
    );
    let config = pipeline_config(&temp_dir, &[("load_sales", source, "sales")]);

    let summary = Pipeline::new(config).unwrap().run(&[]).await.unwrap();

    assert!(summary.is_success());
    let sink = SqliteSink::open(&warehouse_path(&temp_dir)).unwrap();
    assert_eq!(
        column_names(&sink, "sales"),
        vec!["id", "price", "quantity", "tax_amount"]
    );

    let rows = sink.read_rows("sales").unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0][0], Value::Text("1".to_string()));
    assert_eq!(rows[0][1], Value::Real(10.0));
    assert_eq!(rows[0][2], Value::Integer(2));
    assert!((real(&rows[0][3]) - 1.0).abs() < 1e-9);

    assert_eq!(rows[1][0], Value::Text("2".to_string()));
    assert_eq!(rows[1][1], Value::Real(0.0));
    assert_eq!(rows[1][2], Value::Integer(3));
    assert_eq!(real(&rows[1][3]), 0.0);
}

#[tokio::test]
async fn test_source_without_numeric_columns() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(
        &temp_dir,
        "building_metadata.csv",
        "Site ID,Building ID,Primary Use\n0,0,Education\n0,1,Office\n0,0,Education\n",
    );
    let config = pipeline_config(&temp_dir, &[("load_building_data", source, "building")]);

    let summary = Pipeline::new(config).unwrap().run(&[]).await.unwrap();

    assert!(summary.is_success());
    let stats = summary.outcomes[0].result.as_ref().unwrap();
    assert_eq!(stats.rows_extracted, 3);
    assert_eq!(stats.rows_loaded, 2);

    let sink = SqliteSink::open(&warehouse_path(&temp_dir)).unwrap();
    assert_eq!(
        column_names(&sink, "building"),
        vec!["site_id", "building_id", "primary_use"]
    );
    assert_eq!(
        sink.read_rows("building").unwrap(),
        vec![
            vec![
                Value::Text("0".to_string()),
                Value::Text("0".to_string()),
                Value::Text("Education".to_string()),
            ],
            vec![
                Value::Text("0".to_string()),
                Value::Text("1".to_string()),
                Value::Text("Office".to_string()),
            ],
        ]
    );
}

#[tokio::test]
async fn test_rerun_produces_identical_table() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(
        &temp_dir,
        "sales.csv",
        "ID,Price,Quantity\n1,10,2\n2,,3\n1,10,2\n3,4.5,\n",
    );
    let config = pipeline_config(&temp_dir, &[("load_sales", source, "sales")]);
    let pipeline = Pipeline::new(config).unwrap();

    pipeline.run(&[]).await.unwrap();
    let first = SqliteSink::open(&warehouse_path(&temp_dir))
        .unwrap()
        .read_rows("sales")
        .unwrap();

    pipeline.run(&[]).await.unwrap();
    let sink = SqliteSink::open(&warehouse_path(&temp_dir)).unwrap();
    let second = sink.read_rows("sales").unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(sink.row_count("sales").unwrap(), 3);
}

#[tokio::test]
async fn test_replace_discards_rows_from_previous_source() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, "weather.csv", "Site ID,Air Temperature\n0,25\n1,20\n2,18\n");
    let config = pipeline_config(&temp_dir, &[("load_weather_data", source.clone(), "weather")]);
    let pipeline = Pipeline::new(config).unwrap();

    pipeline.run(&[]).await.unwrap();
    std::fs::write(&source, "Site ID,Air Temperature,Wind Speed\n7,30,3.1\n").unwrap();
    pipeline.run(&[]).await.unwrap();

    let sink = SqliteSink::open(&warehouse_path(&temp_dir)).unwrap();
    assert_eq!(sink.row_count("weather").unwrap(), 1);
    assert_eq!(
        column_names(&sink, "weather"),
        vec!["site_id", "air_temperature", "wind_speed"]
    );
}

#[tokio::test]
async fn test_independent_tasks_run_together() {
    let temp_dir = TempDir::new().unwrap();
    let building = write_source(
        &temp_dir,
        "building_metadata.csv",
        "site_id,building_id,square_feet\n0,0,7432\n0,1,2720\n",
    );
    let weather = write_source(
        &temp_dir,
        "weather.csv",
        "site_id,timestamp,air_temperature\n0,2016-01-01 00:00:00,25.0\n0,2016-01-01 01:00:00,24.4\n0,2016-01-01 02:00:00,22.8\n",
    );
    let config = pipeline_config(
        &temp_dir,
        &[
            ("load_building_data", building, "building"),
            ("load_weather_data", weather, "weather"),
        ],
    );

    let summary = Pipeline::new(config).unwrap().run(&[]).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.outcomes.len(), 2);
    // Outcomes come back in configuration order regardless of completion order
    assert_eq!(summary.outcomes[0].task_id, "load_building_data");
    assert_eq!(summary.outcomes[1].task_id, "load_weather_data");
    assert_eq!(summary.total_rows_loaded(), 5);

    let sink = SqliteSink::open(&warehouse_path(&temp_dir)).unwrap();
    assert_eq!(sink.row_count("building").unwrap(), 2);
    assert_eq!(sink.row_count("weather").unwrap(), 3);
}

#[tokio::test]
async fn test_task_filter() {
    let temp_dir = TempDir::new().unwrap();
    let building = write_source(&temp_dir, "b.csv", "id\n1\n");
    let weather = write_source(&temp_dir, "w.csv", "id\n2\n");
    let config = pipeline_config(
        &temp_dir,
        &[
            ("load_building_data", building, "building"),
            ("load_weather_data", weather, "weather"),
        ],
    );

    let summary = Pipeline::new(config)
        .unwrap()
        .run(&["load_weather_data".to_string()])
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 1);
    let sink = SqliteSink::open(&warehouse_path(&temp_dir)).unwrap();
    assert!(sink.table_exists("weather").unwrap());
    assert!(!sink.table_exists("building").unwrap());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(&temp_dir, "sales.csv", "ID,Price,Quantity\n1,10,2\n1,10,2\n");
    let config = pipeline_config(&temp_dir, &[("load_sales", source, "sales")]);

    let previews = Pipeline::new(config).unwrap().dry_run(&[]).await.unwrap();

    assert_eq!(previews.len(), 1);
    let (job, df) = &previews[0];
    assert_eq!(job.table_name, "sales");
    assert_eq!(df.shape(), (1, 4));
    assert!(!warehouse_path(&temp_dir).exists());
}

#[tokio::test]
async fn test_fully_quoted_source() {
    let temp_dir = TempDir::new().unwrap();
    let source = write_source(
        &temp_dir,
        "sales.csv",
        "\"ID\",\"Price\",\"Quantity\"\n\"1\",\"\",\"2\"\n\"\",\"5\",\"1\"\n\"3\",\"4\",\"\"\n",
    );
    let config = pipeline_config(&temp_dir, &[("load_sales", source, "sales")]);

    let summary = Pipeline::new(config).unwrap().run(&[]).await.unwrap();

    assert!(summary.is_success());
    let sink = SqliteSink::open(&warehouse_path(&temp_dir)).unwrap();
    let rows = sink.read_rows("sales").unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0][0], Value::Text("1".to_string()));
    assert_eq!(rows[0][1], Value::Real(0.0));
    assert_eq!(rows[0][2], Value::Integer(2));

    assert_eq!(rows[1][0], Value::Text("3".to_string()));
    assert_eq!(rows[1][1], Value::Real(4.0));
    assert_eq!(rows[1][2], Value::Integer(0));
    assert_eq!(real(&rows[1][3]), 0.0);
}
