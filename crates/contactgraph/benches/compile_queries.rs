use contactgraph::fetch::{compile_fetch, FetchRequest};
use contactgraph::model::{Contact, ContactType, Detail};
use contactgraph::remove::compile_remove;
use contactgraph::request::{Filter, MatchFlags, MatchKind};
use contactgraph::resource::{ClassDescriptor, PropertyDescriptor};
use contactgraph::save::{compile_save, SaveRequest};
use contactgraph::schema::{DetailDefinition, FieldDefinition, Schema};
use contactgraph::value::ValueType;
use contactgraph::vocab::{nco, xsd};
use contactgraph::Settings;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn schema() -> Schema {
    let name = |field: &str, iri: &str| {
        FieldDefinition::new(field)
            .with_chain(vec![PropertyDescriptor::new(iri, nco::PERSON_CONTACT, xsd::STRING)])
    };
    let has_phone_number =
        || PropertyDescriptor::new(nco::HAS_PHONE_NUMBER, nco::ROLE, nco::PHONE_NUMBER).multi_valued();

    Schema::new(ContactType::Person, [nco::PERSON_CONTACT])
        .with_detail(
            DetailDefinition::new("Name")
                .unique()
                .with_field(name("FirstName", nco::NAME_GIVEN))
                .with_field(name("LastName", nco::NAME_FAMILY)),
        )
        .and_then(|schema| {
            schema.with_detail(
                DetailDefinition::new("PhoneNumber")
                    .with_context()
                    .with_field(FieldDefinition::new("PhoneNumber").with_chain(vec![
                        has_phone_number().has_detail_uri().defines_ownership(),
                        PropertyDescriptor::new(
                            nco::PHONE_NUMBER_PROPERTY,
                            nco::PHONE_NUMBER,
                            xsd::STRING,
                        ),
                    ]))
                    .with_field(
                        FieldDefinition::new("SubTypes")
                            .with_type(ValueType::StringList)
                            .with_chain(vec![has_phone_number()])
                            .with_sub_type_classes(vec![
                                ClassDescriptor::new(nco::CELL_PHONE_NUMBER, "Mobile"),
                                ClassDescriptor::new(nco::VOICE_PHONE_NUMBER, "Voice"),
                            ]),
                    ),
            )
        })
        .unwrap()
}

fn bench_fetch(c: &mut Criterion) {
    let schema = schema();
    let settings = Settings::default();
    let mut group = c.benchmark_group("fetch");

    group.bench_function("all_details", |b| {
        let request = FetchRequest::new();
        b.iter(|| black_box(compile_fetch(&schema, &request, &settings).unwrap().to_sparql()));
    });

    group.bench_function("phone_filter", |b| {
        let request = FetchRequest::new().with_filter(Filter::detail_field(
            "PhoneNumber",
            "PhoneNumber",
            "+358 40 1234567",
            MatchFlags::phone_number(),
        ));
        b.iter(|| black_box(compile_fetch(&schema, &request, &settings).unwrap().to_sparql()));
    });

    group.bench_function("name_contains", |b| {
        let request = FetchRequest::new().with_filter(Filter::detail_field(
            "Name",
            "FirstName",
            "ad",
            MatchFlags::new(MatchKind::Contains),
        ));
        b.iter(|| black_box(compile_fetch(&schema, &request, &settings).unwrap().to_sparql()));
    });

    group.finish();
}

fn bench_save(c: &mut Criterion) {
    let schema = schema();
    let settings = Settings::default();
    let mut group = c.benchmark_group("save");

    for phones in [1, 10, 50].iter() {
        let mut contact = Contact::with_id(7, ContactType::Person)
            .with_detail(Detail::new("Name").with_value("FirstName", "Ada"));
        for i in 0..*phones {
            contact = contact.with_detail(
                Detail::new("PhoneNumber")
                    .with_value("PhoneNumber", format!("555{i:04}"))
                    .with_value("SubTypes", vec!["Mobile"]),
            );
        }
        let request = SaveRequest::new(contact).with_contact_iri("urn:contact:7");

        group.bench_with_input(BenchmarkId::new("phones", phones), phones, |b, _| {
            b.iter(|| black_box(compile_save(&schema, &request, &settings).unwrap().to_sparql()));
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let settings = Settings::default();
    let mut group = c.benchmark_group("remove");

    for size in [10u32, 1000, 10_000].iter() {
        let ids: Vec<u32> = (1..=*size).collect();
        group.bench_with_input(BenchmarkId::new("ids", size), size, |b, _| {
            b.iter(|| black_box(compile_remove(&ids, &settings).unwrap().to_string()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fetch, bench_save, bench_remove);
criterion_main!(benches);
