use client_registry::{
    ingest, Cell, ClientQueries, ClientRegistry, ClientSession, IngestOutcome, RegistryError, Schema, Table,
};

const V1_HEADER: &str = "invoiced,quoted,status,products,product_line,contacted,marketed,emailed,contact_name,business_name,phone_number,email_address,business_address,social_media_links";
const V2_HEADER: &str = "invoiced,quoted,status,products,product_line,contacted,contact_name,business_name,phone_number,email_address,business_address,city,state,zip_code,social_media_links";

fn v1() -> Schema {
    Schema::builtin("v1").unwrap()
}

fn csv(header: &str, rows: &[&str]) -> Table {
    let mut text = header.to_string();
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    Table::from_csv_str(&text).unwrap()
}

#[test]
fn test_end_to_end_one_invalid_row() {
    let raw = csv(
        V1_HEADER,
        &[
            "500.00,750,Active,Widgets,Tools,Yes,No,No,Wile,Acme,555-0100,wile@acme.test,1 Desert Rd,",
            "N/A,100,Lead,Gadgets,Toys,no,No,No,Hank,Globex,555-0101,hank@globex.test,2 Cypress Ck,",
        ],
    );
    let schema = v1();
    let result = ingest(&raw, &schema).unwrap();

    assert!(!result.degraded);
    assert_eq!(result.invalid_rows.len(), 1);
    assert_eq!(result.invalid_rows[0].business_name, "Globex");
    assert_eq!(result.coerced.cell(1, "invoiced"), Some(&Cell::Null));
    assert_eq!(result.coerced.cell(0, "invoiced"), Some(&Cell::Number(500.0)));

    assert_eq!(result.coerced.height(), 2);

    // the registry is built from the cleaned rows
    let registry = ClientRegistry::load(&result, &schema);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(0).unwrap().invoiced, Some(500.0));
    assert!(registry.find_by_name("Globex").unwrap_err().is_not_found());
    assert!(registry.duplicate_names().is_empty());
}

#[test]
fn test_missing_column_rejects_without_touching_registry() {
    let mut session = ClientSession::new(v1());
    session
        .upload(&csv(V1_HEADER, &["1,2,Active,W,T,Yes,No,No,Wile,Acme,,,,"]))
        .unwrap();

    // a v2 export lacks marketed/emailed
    let err = session
        .upload(&csv(V2_HEADER, &["1,2,Active,W,T,Yes,Hank,Globex,,,,Springfield,OR,97477,"]))
        .unwrap_err();
    match err {
        RegistryError::SchemaMismatch { missing } => {
            assert_eq!(missing, vec!["marketed".to_string(), "emailed".to_string()])
        }
        other => panic!("expected schema mismatch, got {:?}", other),
    }

    let registry = session.registry().unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.find_by_name("Acme").unwrap().contact_name.as_deref(), Some("Wile"));
}

#[test]
fn test_v2_schema_accepts_address_columns() {
    let mut session = ClientSession::new(Schema::builtin("v2").unwrap());
    let report = session
        .upload(&csv(V2_HEADER, &["1,2,Active,W,T,1,Hank,Globex,,,,Springfield,OR,97477,"]))
        .unwrap();
    assert_eq!(report.outcome, IngestOutcome::Clean);

    let record = session.registry().unwrap().find_by_name("Globex").unwrap();
    assert_eq!(record.city.as_deref(), Some("Springfield"));
    assert_eq!(record.zip_code.as_deref(), Some("97477"));
    assert_eq!(record.marketed, None);
    assert!(record.flag("contacted"));
}

#[test]
fn test_all_invalid_rows_load_degraded() {
    let mut session = ClientSession::new(v1());
    let report = session
        .upload(&csv(
            V1_HEADER,
            &[
                "TBD,,Active,W,T,Yes,No,No,Wile,Acme,,,,",
                "n/a,5,Lead,W,T,No,No,No,Hank,Globex,,,,",
            ],
        ))
        .unwrap();

    assert_eq!(report.outcome, IngestOutcome::Degraded);
    assert_eq!(report.records_loaded, 2);
    assert_eq!(report.invalid_rows.len(), 2);
    assert!(report.cleaned_export.is_none());

    let registry = session.registry().unwrap();
    assert!(registry.is_degraded());
    let acme = registry.find_by_name("Acme").unwrap();
    assert_eq!(acme.invoiced, None);
    assert_eq!(acme.status.as_deref(), Some("Active"));
    assert_eq!(registry.find_by_name("Globex").unwrap().quoted, Some(5.0));
}

#[test]
fn test_degraded_validated_table_is_raw_input() {
    let raw = csv(V1_HEADER, &["TBD,1,Active,W,T,Yes,No,No,Wile,Acme,,,,"]);
    let result = ingest(&raw, &v1()).unwrap();
    assert!(result.degraded);
    assert_eq!(result.validated, raw);
    assert_eq!(result.validated.cell(0, "invoiced"), Some(&Cell::text("TBD")));
}

#[test]
fn test_duplicate_names_first_occurrence_wins() {
    let rows: Vec<String> = (0..8)
        .map(|i| {
            let name = if i == 2 || i == 7 { "Acme".to_string() } else { format!("Client {}", i) };
            format!("{},1,Active,W,T,Yes,No,No,Contact {},{},,,,", i, i, name)
        })
        .collect();
    let row_refs: Vec<&str> = rows.iter().map(|r| r.as_str()).collect();

    let mut session = ClientSession::new(v1());
    let report = session.upload(&csv(V1_HEADER, &row_refs)).unwrap();
    assert_eq!(report.duplicate_names.into_iter().collect::<Vec<_>>(), vec!["Acme".to_string()]);

    let registry = session.registry().unwrap();
    assert_eq!(registry.position_of("Acme").unwrap(), 2);
    assert_eq!(
        registry.find_by_name("Acme").unwrap().contact_name.as_deref(),
        Some("Contact 2")
    );
    assert_eq!(registry.len(), 8);
}

#[test]
fn test_boolean_flags_across_encodings() {
    let mut session = ClientSession::new(v1());
    session
        .upload(&csv(
            V1_HEADER,
            &[
                "1,1,Active,W,T,Yes,1,0,A,Alpha,,,,",
                "1,1,Active,W,T,no,0,1.0,B,Beta,,,,",
                "1,1,Active,W,T,1,0,,C,Gamma,,,,",
                "1,1,Active,W,T,False,yes,0,D,Delta,,,,",
            ],
        ))
        .unwrap();

    let queries = session.queries().unwrap();
    let counts = queries.boolean_flag_counts(&["contacted", "marketed", "emailed"]);
    assert_eq!(counts["contacted"], 2);
    assert_eq!(counts["marketed"], 2);
    assert_eq!(counts["emailed"], 1);
}

#[test]
fn test_search_and_notes_through_session() {
    let mut session = ClientSession::new(v1());
    session
        .upload(&csv(
            V1_HEADER,
            &[
                "1,1,Active,W,T,Yes,No,No,Bill Lumbergh,Initech,,,,",
                "1,1,Active,W,T,Yes,No,No,Wile,Acme,,,,",
            ],
        ))
        .unwrap();

    {
        let registry = session.registry().unwrap();
        let all: Vec<&str> = registry
            .search_by_display_name("")
            .into_iter()
            .map(|(_, r)| r.business_name.as_str())
            .collect();
        assert_eq!(all, vec!["Acme", "Initech"]);
        assert!(registry.search_by_display_name("zzz-no-match").is_empty());
    }

    let position = session.registry().unwrap().position_of("Initech").unwrap();
    let before = session.registry().unwrap().get(position).unwrap().clone();
    session
        .save_notes(position, [("current problem", "TPS reports"), ("needs", "stapler")])
        .unwrap();

    let after = session.registry().unwrap().get(position).unwrap();
    assert_eq!(after.note("current_problem"), Some("TPS reports"));
    assert_eq!(after.note("needs"), Some("stapler"));
    assert_eq!(after.note("wants"), Some(""));
    assert_eq!(after.contact_name, before.contact_name);
    assert_eq!(after.invoiced, before.invoiced);
    assert_eq!(after.extra, before.extra);

    let err = session.save_notes(99, [("needs", "x")]).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_notes_present_in_export_are_loaded() {
    let header = format!("{},needs,current problem", V1_HEADER);
    let mut session = ClientSession::new(v1());
    session
        .upload(&csv(&header, &["1,1,Active,W,T,Yes,No,No,Wile,Acme,,,,,rockets,roadrunner"]))
        .unwrap();

    let record = session.registry().unwrap().find_by_name("Acme").unwrap();
    assert_eq!(record.note("needs"), Some("rockets"));
    assert_eq!(record.note("current_problem"), Some("roadrunner"));
    assert!(record.extra.is_empty());
}

#[test]
fn test_aggregations_for_charts() {
    let mut session = ClientSession::new(v1());
    session
        .upload(&csv(
            V1_HEADER,
            &[
                "100,200,Active,W,Tools,Yes,No,No,A,Alpha,,,,",
                "300,50,Lead,W,Toys,Yes,No,No,B,Beta,,,,",
                "bad,10,Active,W,Tools,Yes,No,No,C,Gamma,,,,",
            ],
        ))
        .unwrap();

    let registry = session.registry().unwrap();
    let queries = ClientQueries::new(registry);
    assert_eq!(queries.numeric_distribution("invoiced"), vec![100.0, 300.0]);
    assert_eq!(queries.numeric_distribution("quoted"), vec![200.0, 50.0]);

    let product_lines = queries.categorical_counts("product_line");
    assert_eq!(product_lines[0].category, "Tools");
    assert_eq!(product_lines[0].count, 1);
    assert_eq!(product_lines[1].category, "Toys");
}

#[test]
fn test_cleaned_export_round_trips_through_ingest() {
    let raw = csv(
        V1_HEADER,
        &[
            "5000.00,0.1,Active,\"Widgets, Gears\",Tools,Yes,No,No,Wile,\"Acme, Inc\",,,,",
            "oops,1,Lead,W,T,No,No,No,Hank,Globex,,,,",
        ],
    );
    let schema = v1();
    let result = ingest(&raw, &schema).unwrap();
    let bytes = result.cleaned_export().unwrap().unwrap();

    let reloaded = ingest(&Table::from_csv_reader(bytes.as_slice()).unwrap(), &schema).unwrap();
    assert_eq!(reloaded.outcome(), IngestOutcome::Clean);
    assert_eq!(reloaded.validated.height(), 1);
    assert_eq!(reloaded.validated.cell(0, "invoiced"), Some(&Cell::Number(5000.0)));
    assert_eq!(reloaded.validated.cell(0, "quoted"), Some(&Cell::Number(0.1)));
    assert_eq!(reloaded.validated.cell(0, "business_name"), Some(&Cell::text("Acme, Inc")));
}

#[test]
fn test_custom_schema_types_drive_registry_values() {
    let zip_numeric = Schema::from_json_str(
        r#"{"version":"zip-numeric","columns":[
            {"name":"business_name","type":"text"},
            {"name":"zip_code","type":"numeric"}]}"#,
    )
    .unwrap();
    let result = ingest(&csv("business_name,zip_code", &["Acme,abc"]), &zip_numeric).unwrap();
    assert!(result.degraded);
    let registry = ClientRegistry::load(&result, &zip_numeric);
    let acme = registry.find_by_name("Acme").unwrap();
    assert_eq!(acme.zip_code, None);
    assert_eq!(acme.value("zip_code"), Some(Cell::Null));

    let text_amounts = Schema::from_json_str(
        r#"{"version":"text-amounts","columns":[
            {"name":"business_name","type":"text"},
            {"name":"invoiced","type":"text"}]}"#,
    )
    .unwrap();
    let result = ingest(&csv("business_name,invoiced", &["Acme,pending"]), &text_amounts).unwrap();
    assert!(result.invalid_rows.is_empty());
    let registry = ClientRegistry::load(&result, &text_amounts);
    let acme = registry.find_by_name("Acme").unwrap();
    assert_eq!(acme.invoiced, None);
    assert_eq!(acme.value("invoiced"), Some(Cell::text("pending")));
}

#[test]
fn test_repeated_header_rejects_upload() {
    let mut session = ClientSession::new(v1());
    session
        .upload(&csv(V1_HEADER, &["1,2,Active,W,T,Yes,No,No,Wile,Acme,,,,"]))
        .unwrap();

    let payload = format!("{},invoiced\n500,2,Active,W,T,Yes,No,No,Hank,Globex,,,,,N/A\n", V1_HEADER);
    let err = session.upload_csv(payload.as_bytes()).unwrap_err();
    assert!(matches!(&err, RegistryError::DuplicateColumn(name) if name == "invoiced"));
    assert!(err.is_upload_rejection());

    let registry = session.registry().unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.find_by_name("Globex").is_err());
}
