use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pgpref::config::Config;
use pgpref::data::haplotype::Samples;
use pgpref::data::marker::{Allele, Marker, Markers};
use pgpref::data::storage::{PackedAllelePanel, PgpRefGt, SampleHapPairs};
use pgpref::io::vcf::VcfReader;
use pgpref::io::vcf_writer::{FormatFields, VcfWriter};
use pgpref::model::{GenotypeEmission, GenotypeValues};
use pgpref::pipelines::ReemitPipeline;
use pgpref::PgpError;
use tempfile::TempDir;

// --- Helpers ---

const HEADER: &str = "##fileformat=VCFv4.2\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=PGP,Number=.,Type=Float,Description=\"Phased genotype probabilities\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS0\tS1\tS2\n";

/// Three markers: a SNP with an annotated region, a SNP without one, and an
/// indel with a region.
const RECORDS: &[&str] = &[
    "1\t100\trs1\tA\tG\t.\tPASS\tSTART=90;END=110\tGT:PGP\t0|1:0.1,0.2,0.7,0\t1|0:0,0.3,0.4,0.3\t0|0:0,0,0,0",
    "1\t300\trs2\tC\tT\t.\tPASS\t.\tGT:PGP\t1|1:0,0,0,1\t0|1:0.5,0.5,0,0\t0|0:1,0,0,0",
    "1\t400\t.\tAT\tA\t.\tPASS\tSTART=390;END=410\tGT:PGP\t0|1:0,0.6,0.4,0\t1|1:0,0,0,1\t1|0:0,0.2,0.8,0",
];

fn write_input(dir: &Path, records: &[&str]) -> PathBuf {
    let path = dir.join("panel.vcf");
    let mut file = File::create(&path).expect("Create input VCF");
    file.write_all(HEADER.as_bytes()).unwrap();
    for rec in records {
        writeln!(file, "{}", rec).unwrap();
    }
    path
}

fn config(input: &Path, out: &Path) -> Config {
    Config {
        r#ref: input.to_path_buf(),
        out: out.to_path_buf(),
        nosnps: false,
        gt_only: false,
        source: Some("pgpref-test".to_string()),
        nthreads: Some(2),
        batch: 2,
        profile: false,
    }
}

fn read_bgzf(path: &Path) -> String {
    let file = File::open(path).expect("Open output VCF");
    let mut reader = ::noodles::bgzf::Reader::new(file);
    let mut text = String::new();
    reader.read_to_string(&mut text).expect("Decompress output VCF");
    text
}

fn data_lines(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| l.split('\t').map(str::to_string).collect())
        .collect()
}

fn run(cfg: Config) -> pgpref::Result<(String, pgpref::pipelines::ReemitSummary)> {
    let out_path = cfg.output_path();
    let summary = ReemitPipeline::new(cfg).run()?;
    Ok((read_bgzf(&out_path), summary))
}

// --- Pipeline ---

#[test]
fn test_pipeline_writes_all_records() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let (text, summary) = run(config(&input, &dir.path().join("out"))).unwrap();

    assert_eq!(summary.n_samples, 3);
    assert_eq!(summary.n_records, 3);
    assert_eq!(summary.n_written, 3);

    let header: Vec<&str> = text.lines().take_while(|l| l.starts_with('#')).collect();
    assert_eq!(header[0], "##fileformat=VCFv4.1");
    assert!(header[1].starts_with("##filedate="));
    assert_eq!(header[2], "##source=\"pgpref-test\"");
    assert!(header.iter().any(|l| l.starts_with("##FORMAT=<ID=PGP")));
    assert_eq!(
        *header.last().unwrap(),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS0\tS1\tS2"
    );

    let lines = data_lines(&text);
    assert_eq!(lines.len(), 3);
    assert_eq!(&lines[0][..7], &["1", "100", "rs1", "A", "G", ".", "PASS"]);
    assert!(lines[0][7].starts_with("AR2="));
    assert!(lines[0][7].ends_with(";START=90;END=110"));
    assert_eq!(lines[0][8], "GT:DS:GP:PGP");
    assert_eq!(lines[1][8], "GT:DS:GP");
    assert_eq!(lines[2][2], ".");
}

#[test]
fn test_switched_orientation_is_transposed() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let (text, _) = run(config(&input, &dir.path().join("out"))).unwrap();
    let lines = data_lines(&text);

    // S0 is 0|1 but its PGP puts more weight on 1|0
    assert_eq!(lines[0][9], "0|1:0.9:0.1,0.9,0:0.1,0.7,0.2,0");
}

#[test]
fn test_dose_and_agreeing_orientation() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let (text, _) = run(config(&input, &dir.path().join("out"))).unwrap();
    let lines = data_lines(&text);

    // 0.7 heterozygous + 2 * 0.3 homozygous ALT
    assert_eq!(lines[0][10], "1|0:1.3:0,0.7,0.3:0,0.3,0.4,0.3");
}

#[test]
fn test_zero_sum_sample_prints_missing() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let (text, _) = run(config(&input, &dir.path().join("out"))).unwrap();
    let lines = data_lines(&text);

    assert_eq!(lines[0][11], "0|0:.:.:.");
}

#[test]
fn test_pgp_only_with_region() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let (text, _) = run(config(&input, &dir.path().join("out"))).unwrap();
    let lines = data_lines(&text);

    assert_eq!(lines[1][9], "1|1:2:0,0,1");
    assert_eq!(lines[1][10], "0|1:0.5:0.5,0.5,0");
    assert!(!lines[1][7].contains("START"));
    assert_eq!(lines[1][8], "GT:DS:GP");
}

#[test]
fn test_nosnps_skips_snvs() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let mut cfg = config(&input, &dir.path().join("out"));
    cfg.nosnps = true;
    let (text, summary) = run(cfg).unwrap();

    assert_eq!(summary.n_records, 3);
    assert_eq!(summary.n_written, 1);
    let lines = data_lines(&text);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0][1], "400");
    assert_eq!(lines[0][3], "AT");
}

#[test]
fn test_gt_only_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let mut cfg = config(&input, &dir.path().join("out"));
    cfg.gt_only = true;
    let (text, _) = run(cfg).unwrap();

    assert!(!text.contains("##FORMAT=<ID=GP"));
    let lines = data_lines(&text);
    assert_eq!(
        lines[0].join("\t"),
        "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT\t0|1\t1|0\t0|0"
    );
}

#[test]
fn test_unphased_sample_aborts_run() {
    let dir = TempDir::new().unwrap();
    let records = [
        RECORDS[0],
        "1\t300\trs2\tC\tT\t.\tPASS\t.\tGT:PGP\t1|1:0,0,0,1\t0/1:0.5,0.5,0,0\t0|0:1,0,0,0",
    ];
    let input = write_input(dir.path(), &records);
    let err = run(config(&input, &dir.path().join("out"))).unwrap_err();

    match err {
        PgpError::MalformedGenotype { sample, .. } => assert_eq!(sample, "S1"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_short_pgp_vector_aborts_run() {
    let dir = TempDir::new().unwrap();
    let records = ["1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t0|1:0.1,0.9\t0|0:1,0,0,0\t0|0:1,0,0,0"];
    let input = write_input(dir.path(), &records);
    let err = run(config(&input, &dir.path().join("out"))).unwrap_err();

    assert!(matches!(err, PgpError::MalformedProbabilityVector { .. }));
    assert!(err
        .to_string()
        .contains("expected 4 tokens in PGP FORMAT field but found 2"));
}

#[test]
fn test_missing_pgp_format_aborts_run() {
    let dir = TempDir::new().unwrap();
    let records = ["1\t100\trs1\tA\tG\t.\tPASS\t.\tGT\t0|1\t0|0\t0|0"];
    let input = write_input(dir.path(), &records);
    let err = run(config(&input, &dir.path().join("out"))).unwrap_err();

    assert!(matches!(err, PgpError::Vcf { .. }));
}

#[test]
fn test_infinite_pgp_value_aborts_run() {
    let dir = TempDir::new().unwrap();
    let records = ["1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t0|1:0.1,0.9,0,0\t0|0:1,0,inf,0\t0|0:1,0,0,0"];
    let input = write_input(dir.path(), &records);
    let err = run(config(&input, &dir.path().join("out"))).unwrap_err();

    match err {
        PgpError::MalformedProbabilityVector { sample, .. } => assert_eq!(sample, "S1"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_too_many_alleles_aborts_run() {
    let dir = TempDir::new().unwrap();
    let alts: Vec<String> = (0..299).map(|i| format!("<A{}>", i)).collect();
    let record = format!(
        "1\t100\t.\tA\t{}\t.\tPASS\tSTART=90\tGT:PGP\t0|1:0\t0|0:0\t1|1:0",
        alts.join(",")
    );
    let input = write_input(dir.path(), &[record.as_str()]);
    let err = run(config(&input, &dir.path().join("out"))).unwrap_err();

    assert!(matches!(err, PgpError::Parse { line: 5, .. }));
}

// --- Writer ---

fn writer_fixture() -> (SampleHapPairs, GenotypeValues) {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), RECORDS);
    let reader = VcfReader::open(&input).unwrap();
    let samples = reader.samples_arc();
    let mut panels = Vec::new();
    let mut values = Vec::new();
    for rec in reader {
        let rec = rec.unwrap();
        panels.push(PgpRefGt::from_record(&rec).unwrap());
        let pgp: Vec<f32> = rec
            .format_data("PGP")
            .unwrap()
            .iter()
            .flat_map(|f| f.split(',').map(|t| t.parse::<f32>().unwrap()))
            .collect();
        values.push(pgp);
    }
    let haps = SampleHapPairs::from_ref_panels(&panels).unwrap();
    let mut gv = GenotypeValues::new(haps.markers_arc(), samples);
    for (m, pgp) in values.into_iter().enumerate() {
        gv.set_marker_phased(m, pgp).unwrap();
    }
    (haps, gv)
}

fn render(haps: &SampleHapPairs, gv: &GenotypeValues) -> Vec<u8> {
    let mut writer = VcfWriter::new(Vec::new());
    writer
        .write_meta_lines_dated(haps.samples().ids(), None, FormatFields::with_probs(), "20240101")
        .unwrap();
    writer
        .append_records(haps, gv, 0, haps.n_markers(), true)
        .unwrap();
    writer.into_inner().unwrap()
}

#[test]
fn test_reemit_is_idempotent() {
    let (haps, gv) = writer_fixture();
    let first = render(&haps, &gv);
    let second = render(&haps, &gv);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_partial_range() {
    let (haps, gv) = writer_fixture();
    let mut writer = VcfWriter::new(Vec::new());
    writer.append_records(&haps, &gv, 1, 2, true).unwrap();
    let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("1\t300\trs2\t"));
}

#[test]
fn test_invalid_range_rejected() {
    let (haps, gv) = writer_fixture();
    let mut writer = VcfWriter::new(Vec::new());
    assert!(matches!(
        writer.append_records(&haps, &gv, 2, 1, true),
        Err(PgpError::InvalidData { .. })
    ));
    assert!(matches!(
        writer.append_records(&haps, &gv, 0, 4, true),
        Err(PgpError::InvalidData { .. })
    ));
}

#[test]
fn test_inconsistent_markers_rejected() {
    let (haps, _) = writer_fixture();
    let other = Arc::new(Markers::new(
        (0..3)
            .map(|i| Marker::new("2", 10 + i, None, Allele::parse("A"), vec![Allele::parse("C")]))
            .collect(),
    ));
    let gv = GenotypeValues::new(other, Arc::new(haps.samples().clone()));
    let mut writer = VcfWriter::new(Vec::new());
    assert!(matches!(
        writer.append_records(&haps, &gv, 0, 3, true),
        Err(PgpError::InconsistentMarkers { .. })
    ));
}

#[test]
fn test_inconsistent_samples_rejected() {
    let (haps, _) = writer_fixture();
    let samples = Arc::new(Samples::from_ids(vec!["S0".to_string(), "S1".to_string()]));
    let gv = GenotypeValues::new(haps.markers_arc(), samples);
    let mut writer = VcfWriter::new(Vec::new());
    assert!(matches!(
        writer.append_records(&haps, &gv, 0, 3, true),
        Err(PgpError::InconsistentSamples { .. })
    ));
}

// --- Emission ---

#[test]
fn test_emission_from_typed_parts() {
    let marker = Marker::new("1", 5, None, Allele::parse("A"), vec![Allele::parse("G")]);
    let samples = Arc::new(Samples::from_ids(vec!["A".to_string(), "B".to_string()]));
    let alleles = PackedAllelePanel::from_pairs(&[(0, 1), (1, 1)], 2).unwrap();
    let pgp = [vec![0.1f32, 0.6, 0.3, 0.0], vec![0.0, 0.0, 0.0, 1.0]];
    let panel = PgpRefGt::from_phased_probs(marker, samples, alleles, &pgp).unwrap();

    let emission: &dyn GenotypeEmission = &panel;
    assert!(emission.is_ref_data());
    assert!(!emission.is_missing_data());
    assert_eq!(emission.n_samples(), 2);
    assert!((emission.gl(0, 0, 1) - 0.6).abs() < 1e-6);
    assert!((emission.gl(0, 1, 0) - 0.4).abs() < 1e-6);
    assert_eq!(emission.gl(0, 1, 1), 0.0);
    assert_eq!(emission.gl(1, 1, 1), 1.0);
}
