use std::{fs::File, sync::Arc};

use arrow::{array::AsArray, datatypes::Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::json;
use target_parquet_core::PipelineOptions;
use target_parquet_writer::{Compression, ParquetFileWriter, WriteOptions};

use common::{record_line, run_lines, schema_line, state_line};

mod common;

#[tokio::test]
async fn test_pipeline_writes_parquet_files() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ParquetFileWriter::try_new(WriteOptions {
        destination_path: dir.path().join("out"),
        compression: Some(Compression::Snappy),
        streams_in_separate_folder: true,
        ..Default::default()
    })
    .expect("parquet writer");

    let mut lines = vec![schema_line(
        "users",
        json!({ "id": { "type": "integer" }, "name": { "type": "string" } }),
    )];
    lines.extend((0..5).map(|i| record_line("users", json!({ "id": i, "name": format!("u{i}") }))));
    lines.push(state_line(json!({ "users": 4 })));

    let output = run_lines(
        &lines,
        Arc::new(writer),
        PipelineOptions::default().with_file_size(3),
    )
    .await
    .expect("pipeline run");

    assert_eq!(output.state, Some(json!({ "users": 4 })));
    assert_eq!(output.files.len(), 2);

    let mut ids = Vec::new();
    for path in &output.files {
        assert_eq!(path.parent(), Some(dir.path().join("out").join("users").as_path()));
        assert!(path.to_string_lossy().ends_with(".snappy.parquet"));

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        for batch in reader {
            let batch = batch.unwrap();
            let column = batch
                .column_by_name("id")
                .unwrap()
                .as_primitive::<Int64Type>();
            ids.extend(column.values().iter().copied());
        }
    }

    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}
