//! Expansion of multi-valued fields into one row per value.

use crate::schema::{Record, Schema, Table, Value};

/// Expands `record` on `field`, one output record per list element, in list
/// order. Every other field is copied unchanged.
///
/// An empty list still yields exactly one record, with `field` set to null,
/// so entities without any classified value survive. A field that is absent
/// or already scalar yields the record as is.
pub fn normalize(record: &Record, field: &str) -> Vec<Record> {
    let values = match record.get(field) {
        Some(Value::List(values)) => values,
        _ => return vec![record.clone()],
    };

    if values.is_empty() {
        let mut expanded = record.clone();
        expanded.insert(field.to_string(), Value::Null);
        return vec![expanded];
    }

    values
        .iter()
        .map(|value| {
            let mut expanded = record.clone();
            expanded.insert(field.to_string(), Value::Text(value.clone()));
            expanded
        })
        .collect()
}

/// Applies [`normalize`] on `field` to every row of `table`.
pub fn normalize_table(table: Table, field: &str) -> Table {
    let columns = table.columns().to_vec();
    let rows = table
        .into_rows()
        .iter()
        .flat_map(|record| normalize(record, field))
        .collect();
    Table::new(columns, rows)
}

/// Expands every multi-valued field `schema` declares, one after the other,
/// bringing the table to first normal form.
pub fn flatten(table: Table, schema: &Schema) -> Table {
    schema
        .multi_valued_fields()
        .fold(table, |table, field| normalize_table(table, field.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;

    fn artist_record(genres: Vec<&str>) -> Record {
        let mut record = Record::new();
        record.insert("ARTIST_ID".into(), Value::from("ar1"));
        record.insert("ARTIST_NAME".into(), Value::from("Slowdive"));
        record.insert(
            "ARTIST_GENRE".into(),
            Value::List(genres.into_iter().map(String::from).collect()),
        );
        record.insert("ARTIST_POPULARITY".into(), Value::Integer(61));
        record
    }

    #[test]
    fn test_normalize_one_record_per_value_in_order() {
        let record = artist_record(vec!["shoegaze", "dream pop", "noise pop"]);
        let rows = normalize(&record, "ARTIST_GENRE");

        assert_eq!(rows.len(), 3);
        let genres: Vec<&Value> = rows.iter().map(|row| &row["ARTIST_GENRE"]).collect();
        assert_eq!(
            genres,
            vec![
                &Value::from("shoegaze"),
                &Value::from("dream pop"),
                &Value::from("noise pop"),
            ]
        );
        for row in &rows {
            assert_eq!(row["ARTIST_ID"], Value::from("ar1"));
            assert_eq!(row["ARTIST_NAME"], Value::from("Slowdive"));
            assert_eq!(row["ARTIST_POPULARITY"], Value::Integer(61));
            assert_eq!(row.len(), record.len());
        }
    }

    #[test]
    fn test_normalize_empty_list_keeps_single_record() {
        let record = artist_record(vec![]);
        let rows = normalize(&record, "ARTIST_GENRE");

        assert_eq!(rows.len(), 1);
        assert!(rows[0]["ARTIST_GENRE"].is_null());
        assert_eq!(rows[0]["ARTIST_ID"], Value::from("ar1"));
    }

    #[test]
    fn test_normalize_decoded_empty_cell_keeps_placeholder() {
        let record = artist_record(vec![""]);
        let rows = normalize(&record, "ARTIST_GENRE");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["ARTIST_GENRE"], Value::from(""));
    }

    #[test]
    fn test_normalize_scalar_field_is_untouched() {
        let record = artist_record(vec!["a"]);
        assert_eq!(normalize(&record, "ARTIST_NAME"), vec![record.clone()]);
        assert_eq!(normalize(&record, "NOT_A_FIELD"), vec![record]);
    }

    #[test]
    fn test_flatten_composes_every_multi_valued_field() {
        let schema = Schema::new(
            "composed",
            vec![
                FieldDescriptor::text("ID"),
                FieldDescriptor::text("ARTISTS").multi(),
                FieldDescriptor::text("GENRES").multi(),
            ],
            vec!["ID"],
        );

        let mut record = Record::new();
        record.insert("ID".into(), Value::from("t1"));
        record.insert(
            "ARTISTS".into(),
            Value::List(vec!["a".into(), "b".into()]),
        );
        record.insert(
            "GENRES".into(),
            Value::List(vec!["x".into(), "y".into(), "z".into()]),
        );
        let table = Table::new(schema.field_names(), vec![record]);

        let flat = flatten(table, &schema);

        assert_eq!(flat.len(), 6);
        assert_eq!(flat.columns(), schema.field_names().as_slice());
        assert!(
            flat.rows()
                .iter()
                .all(|row| row.values().all(|value| !matches!(value, Value::List(_))))
        );
        assert_eq!(flat.rows()[0]["ARTISTS"], Value::from("a"));
        assert_eq!(flat.rows()[0]["GENRES"], Value::from("x"));
        assert_eq!(flat.rows()[5]["ARTISTS"], Value::from("b"));
        assert_eq!(flat.rows()[5]["GENRES"], Value::from("z"));
    }
}
