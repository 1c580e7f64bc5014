use anyhow::Result;
use contract_merge::adapters::csv_records::parse_records;
use contract_merge::core::resolver::FieldSource;
use contract_merge::domain::model::{
    AlwaysIncludeItem, Condition, DynamicBlock, MappingEntry, OutputType, PlaceholderMapping,
    Record, RenderedItem, Template,
};
use contract_merge::{
    collect, evaluate, render, resolve, InMemoryBlockStore, InMemoryMappingRegistry,
    TemplateMerger,
};
use serde_json::json;

fn dr_a() -> Record {
    Record::new()
        .with("name", "Dr. A")
        .with("clinicalFTE", 0.8)
        .with("administrativeFte", 0.2)
}

fn salary_condition() -> Condition {
    Condition::new("baseSalary", ">", "0", "Base Salary")
}

#[test]
fn test_dr_a_renders_two_bullets_in_order() {
    let items = collect(
        &[Condition::new("clinicalFTE", ">", "0", "Clinical FTE")],
        &[AlwaysIncludeItem::new("Admin FTE", "administrativeFte")],
        &dr_a(),
    );

    assert_eq!(
        items,
        vec![
            RenderedItem::new("Clinical FTE", "0.8"),
            RenderedItem::new("Admin FTE", "0.2"),
        ]
    );
    assert_eq!(
        render(&items, &OutputType::Bullets),
        "<ul><li><strong>Clinical FTE:</strong> 0.8</li><li><strong>Admin FTE:</strong> 0.2</li></ul>"
    );
}

#[test]
fn test_base_salary_condition_cases() {
    let condition = salary_condition();

    assert!(evaluate(&condition, &Record::new().with("baseSalary", 280000)));
    assert!(!evaluate(&condition, &Record::new().with("baseSalary", -5)));
    assert!(!evaluate(&condition, &dr_a()));
}

#[test]
fn test_absent_field_is_false_for_every_operator() {
    let record = dr_a().with("dynamicFields", r#"{"OtherFTE": 1}"#);
    for op in [">", ">=", "=", "!=", "<", "<="] {
        let condition = Condition::new("callCoverage", op, "0", "Call Coverage");
        assert!(!evaluate(&condition, &record), "operator {}", op);
    }
}

#[test]
fn test_top_level_beats_extension() {
    let record = Record::new()
        .with("clinicalFTE", 0.8)
        .with("dynamicFields", json!({"clinicalFTE": 0.1}));

    let resolved = resolve(&record, "clinicalFTE").unwrap();
    assert_eq!(resolved.value, json!(0.8));
    assert_eq!(resolved.source, FieldSource::Direct);
}

#[test]
fn test_division_chief_fte_resolves_from_capitalized_extension_key() {
    let record = Record::new()
        .with("name", "Dr. B")
        .with("dynamicFields", r#"{"DivisionChiefFTE": "0.3"}"#);

    let resolved = resolve(&record, "divisionChiefFTE").unwrap();
    assert_eq!(resolved.value, json!("0.3"));
    assert_eq!(resolved.matched_name, "DivisionChiefFTE");
    assert_eq!(resolved.source, FieldSource::Extension);

    let condition = Condition::new("divisionChiefFTE", ">=", "0.3", "Division Chief FTE");
    assert!(evaluate(&condition, &record));
}

#[test]
fn test_tables_have_same_rows_and_headers() {
    let items = vec![
        RenderedItem::new("Clinical FTE", "0.8"),
        RenderedItem::new("Admin FTE", "0.2"),
        RenderedItem::new("Research FTE", "0.1"),
    ];

    let bordered = render(&items, &OutputType::Table);
    let plain = render(&items, &OutputType::TableNoBorders);

    assert_eq!(bordered.matches("<tr>").count(), 4);
    assert_eq!(bordered.matches("<tr>").count(), plain.matches("<tr>").count());
    assert_eq!(bordered.matches("<td").count(), plain.matches("<td").count());
    for text in [">Activity<", ">Value<", ">Clinical FTE<", ">0.8<", ">Research FTE<"] {
        assert!(bordered.contains(text) && plain.contains(text), "{}", text);
    }
    assert_ne!(bordered, plain);
}

#[test]
fn test_render_is_pure_and_empty_renders_nothing() {
    let items = vec![RenderedItem::new("Admin FTE", "0.2")];
    for output_type in ["bullets", "list", "table", "table-no-borders", "paragraph", "grid"] {
        let output_type = OutputType::from(output_type);
        assert_eq!(render(&items, &output_type), render(&items, &output_type));
        assert_eq!(render(&[], &output_type), "");
    }
}

#[tokio::test]
async fn test_merge_does_not_reexpand_block_output() -> Result<()> {
    let blocks = InMemoryBlockStore::new(vec![DynamicBlock::new("notes", "notesBlock", "paragraph")
        .with_always_include(AlwaysIncludeItem::new("Note", "note"))])?;
    let mappings = InMemoryMappingRegistry::from_entries(
        "offer",
        vec![
            MappingEntry {
                template_id: None,
                placeholder: "notesBlock".to_string(),
                mapping: PlaceholderMapping::Dynamic {
                    block_id: "notes".to_string(),
                },
            },
            MappingEntry {
                template_id: None,
                placeholder: "providerName".to_string(),
                mapping: PlaceholderMapping::Field {
                    column: "name".to_string(),
                },
            },
        ],
    );
    let merger = TemplateMerger::new(blocks, mappings);
    let template = Template::new("offer", "{{ notesBlock }} / {{providerName}}");

    let record = Record::new()
        .with("name", "Dr. A")
        .with("note", "see {{providerName}}");
    let outcome = merger.merge(&template, &record).await?;

    assert_eq!(outcome.content, "<p>Note: see {{providerName}}</p> / Dr. A");
    assert!(outcome.unresolved.is_empty());
    assert!(outcome.missing_fields.is_empty());

    let again = merger.merge(&template, &record).await?;
    assert_eq!(again, outcome);
    Ok(())
}

#[tokio::test]
async fn test_salary_field_is_formatted_as_currency() -> Result<()> {
    let mappings = InMemoryMappingRegistry::from_entries(
        "offer",
        vec![MappingEntry {
            template_id: None,
            placeholder: "salary".to_string(),
            mapping: PlaceholderMapping::Field {
                column: "baseSalary".to_string(),
            },
        }],
    );
    let merger = TemplateMerger::new(InMemoryBlockStore::new(vec![])?, mappings);
    let template = Template::new("offer", "Base: {{salary}}");

    let outcome = merger
        .merge(&template, &Record::new().with("baseSalary", 280000))
        .await?;
    assert_eq!(outcome.content, "Base: $280,000.00");
    Ok(())
}

#[tokio::test]
async fn test_csv_identifiers_reach_document_verbatim() -> Result<()> {
    let records = parse_records(
        b"name,zip,npi,employeeId,payPeriodsPerYear\nDr. A,02115,0012345678,1e3,26\n",
        "dynamicFields",
    )?;

    let entries = [
        ("zip", "zip"),
        ("npi", "npi"),
        ("eid", "employeeId"),
        ("periods", "payPeriodsPerYear"),
    ]
    .into_iter()
    .map(|(placeholder, column)| MappingEntry {
        template_id: None,
        placeholder: placeholder.to_string(),
        mapping: PlaceholderMapping::Field {
            column: column.to_string(),
        },
    })
    .collect();
    let merger = TemplateMerger::new(
        InMemoryBlockStore::new(vec![])?,
        InMemoryMappingRegistry::from_entries("offer", entries),
    );
    let template = Template::new("offer", "{{zip}}|{{npi}}|{{eid}}|{{periods}}");

    let outcome = merger.merge(&template, &records[0]).await?;
    assert_eq!(outcome.content, "02115|0012345678|1e3|26");
    Ok(())
}
