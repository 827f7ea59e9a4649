//! Integration tests over the public API using hand-built token pages.
//!
//! No pdfium library is needed: tokens are placed at the coordinates the
//! real roster uses, then run through the same pipeline `convert` uses.

use pharmacy_roster::{
    records_from_pages, AddressDecomposer, AddressRules, Column, ColumnLayout, ColumnRange,
    CsvSink, PageLayout, PageTokens, PharmacyRecord, RecordAssembler, RecordSink, RosterConfig,
    RosterPipeline, Token,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Left edge of each column in the default layout, plus a small inset.
fn x(column: Column) -> f64 {
    ColumnLayout::default()
        .range(column)
        .map(|r| r.x_min + 4.0)
        .unwrap_or(0.0)
}

/// Builds one page of tokens line by line.
struct PageBuilder {
    page: usize,
    tokens: Vec<Token>,
}

impl PageBuilder {
    fn new(page: usize) -> Self {
        Self {
            page,
            tokens: Vec::new(),
        }
    }

    /// Place the words of `text` in `column` at `top`, left to right.
    fn cell(mut self, column: Column, top: f64, text: &str) -> Self {
        let mut pos = x(column);
        for word in text.split_whitespace() {
            self.tokens.push(Token::new(word, pos, top, self.page));
            pos += 6.0 * word.len() as f64 + 3.5;
        }
        self
    }

    fn build(self) -> PageTokens {
        PageTokens {
            page_number: self.page,
            tokens: self.tokens,
        }
    }
}

fn header(builder: PageBuilder, top: f64) -> PageBuilder {
    builder
        .cell(Column::LicenseNo, top, "License")
        .cell(Column::LicenseType, top, "License Type")
        .cell(Column::LicenseeName, top, "Licensee Name")
        .cell(Column::Address, top, "Address")
}

fn config() -> RosterConfig {
    RosterConfig::builder().build().unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn two_page_roster_end_to_end() {
    let page1 = header(PageBuilder::new(1), 110.0)
        .cell(Column::LicenseNo, 140.0, "1001")
        .cell(Column::LicenseType, 140.0, "Community Pharmacy")
        .cell(Column::LicenseeName, 140.0, "Hometown Drug Inc")
        .cell(Column::Dba, 140.0, "Hometown Pharmacy")
        .cell(Column::Address, 140.0, "123 Main St Ste 2")
        .cell(Column::SsnFein, 140.0, "XX-XXX1111")
        .cell(Column::Dates, 140.0, "01/15/2019")
        .cell(Column::Address, 151.0, "Lincoln NE 68508")
        .cell(Column::Dates, 151.0, "06/30/2026")
        .cell(Column::LicenseNo, 170.0, "1002")
        .cell(Column::LicenseeName, 170.0, "Prairie Health LLC")
        .cell(Column::Address, 170.0, "PO Box 77 Ogallala")
        .cell(Column::Address, 181.0, "NE 69153")
        .build();

    let page2 = header(PageBuilder::new(2), 30.0)
        .cell(Column::LicenseNo, 60.0, "1003")
        .cell(Column::LicenseeName, 60.0, "Big Box Retail")
        .cell(Column::Address, 60.0, "500 W Dodge Rd Omaha NE 68114")
        .cell(Column::Dates, 60.0, "3/1/2020")
        .cell(Column::Address, 80.0, "Total Licenses: 3")
        .build();

    // Pages handed over out of order.
    let records = records_from_pages(vec![page2, page1], &config());
    assert_eq!(records.len(), 3);

    let r = &records[0];
    assert_eq!(r.license_no, "1001");
    assert_eq!(r.license_type, "Community Pharmacy");
    assert_eq!(r.licensee_name, "Hometown Drug Inc");
    assert_eq!(r.dba, "Hometown Pharmacy");
    assert_eq!(r.address, "123 Main St Ste 2 Lincoln NE 68508");
    assert_eq!(r.street, "123 Main St Ste 2");
    assert_eq!(r.city, "Lincoln");
    assert_eq!(r.state, "NE");
    assert_eq!(r.zip, "68508");
    assert_eq!(r.ssn_fein, "XX-XXX1111");
    assert_eq!(r.issue_date, "2019-01-15");
    assert_eq!(r.exp_date, "2026-06-30");

    let r = &records[1];
    assert_eq!(r.license_no, "1002");
    assert_eq!(r.street, "PO Box 77");
    assert_eq!(r.city, "Ogallala");
    assert_eq!(r.zip, "69153");
    assert_eq!(r.issue_date, "");

    let r = &records[2];
    assert_eq!(r.license_no, "1003");
    assert_eq!(r.address, "500 W Dodge Rd Omaha NE 68114");
    assert_eq!(r.street, "500 W Dodge Rd");
    assert_eq!(r.city, "Omaha");
    // Single-digit month/day is not date-shaped.
    assert_eq!(r.issue_date, "");
}

#[test]
fn continuation_binds_to_nearest_row_above() {
    let page = PageBuilder::new(2)
        .cell(Column::LicenseNo, 140.0, "1001")
        .cell(Column::Address, 148.0, "Kearney")
        .cell(Column::LicenseNo, 160.0, "1002")
        .build();

    let rows = RecordAssembler::default().assemble_page(&page);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].address, "Kearney");
    assert_eq!(rows[1].address, "");
}

#[test]
fn every_record_has_a_license_number() {
    let mut builder = PageBuilder::new(3);
    for (i, top) in [300.0, 100.0, 220.0, 160.0].iter().enumerate() {
        builder = builder
            .cell(Column::LicenseNo, *top, &format!("{}", 5000 + i))
            .cell(Column::Address, *top + 8.0, "somewhere");
    }
    let records = RosterPipeline::default().process_document(vec![builder.build()]);

    let numbers: Vec<&str> = records.iter().map(|r| r.license_no.as_str()).collect();
    assert_eq!(numbers, ["5001", "5003", "5002", "5000"]);
    assert!(records.iter().all(|r| !r.license_no.is_empty()));
}

#[test]
fn page_without_license_numbers_is_empty() {
    let page = header(PageBuilder::new(2), 60.0)
        .cell(Column::Address, 100.0, "orphan text")
        .build();
    assert!(records_from_pages(vec![page], &config()).is_empty());
}

#[test]
fn custom_layout_moves_columns() {
    let columns = ColumnLayout::new(vec![
        ColumnRange::new(Column::LicenseNo, 0.0, 40.0),
        ColumnRange::new(Column::LicenseeName, 40.0, 200.0),
        ColumnRange::new(Column::Address, 200.0, 400.0),
    ])
    .unwrap();
    let layout = PageLayout {
        columns,
        first_page_header_cutoff: 0.0,
        ..PageLayout::default()
    };
    let config = RosterConfig::builder().layout(layout).build().unwrap();

    let page = PageTokens {
        page_number: 1,
        tokens: vec![
            Token::new("77", 5.0, 20.0, 1),
            Token::new("Corner", 45.0, 20.0, 1),
            Token::new("Drug", 90.0, 20.0, 1),
            Token::new("9", 210.0, 20.0, 1),
            Token::new("Elm", 220.0, 20.0, 1),
            Token::new("St", 240.0, 20.0, 1),
            Token::new("Lexington", 260.0, 20.0, 1),
            Token::new("NE", 300.0, 20.0, 1),
            Token::new("68850", 320.0, 20.0, 1),
        ],
    };
    let records = records_from_pages(vec![page], &config);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].licensee_name, "Corner Drug");
    assert_eq!(records[0].city, "Lexington");
}

#[test]
fn custom_suffixes_change_street_boundary() {
    let decomposer = AddressDecomposer::new(AddressRules::new(["plaza"], ["ste"]));
    let parsed = decomposer.decompose("1 Market Plaza Grand Island NE 68801");
    assert_eq!(parsed.street, "1 Market Plaza");
    assert_eq!(parsed.city, "Grand Island");

    let default = AddressDecomposer::default().decompose("1 Market Plaza Grand Island NE 68801");
    assert_eq!(default.street, "1 Market Plaza Grand");
    assert_eq!(default.city, "Island");
}

#[test]
fn csv_sink_writes_roster_layout() {
    let page = PageBuilder::new(2)
        .cell(Column::LicenseNo, 100.0, "1001")
        .cell(Column::LicenseeName, 100.0, "Acme, Inc")
        .cell(Column::Address, 100.0, "1 Main St Omaha NE 68102")
        .build();
    let records = records_from_pages(vec![page], &config());

    let mut sink = CsvSink::new(Vec::new()).unwrap();
    for r in &records {
        sink.accept(r).unwrap();
    }
    sink.finish().unwrap();
    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();

    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), PharmacyRecord::CSV_HEADER.join(","));
    assert_eq!(
        lines.next().unwrap(),
        "1001,,\"Acme, Inc\",,1 Main St Omaha NE 68102,1 Main St,Omaha,NE,68102,,,"
    );
    assert!(lines.next().is_none());
}
