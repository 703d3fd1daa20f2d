// Credential verification command-line front end

use clap::{Parser, Subcommand};
use credverify::{
    models::{DocumentKind, SimilarityResult, Verdict, VerificationFailure, VerificationOutcome},
    processing::{CredentialClassifier, DocumentHandle, TempArena, TesseractExtractor, TextComparator, TextExtraction},
    validation::VerdictClassifier,
    CredentialError, CredentialVerifier, VerifierConfig,
};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser, Debug)]
#[command(name = "credverify", version, about = "Academic credential authenticity checker")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a submitted document against the issued copy in the content store
    Verify {
        #[arg(long, help = "Content id of the issued reference document")]
        cid: String,
        #[arg(long, help = "Path to the submitted document")]
        candidate: PathBuf,
        #[arg(long, help = "Credential type recorded for the reference")]
        declared_type: Option<String>,
        #[arg(long, default_value_t = false, help = "Delete the candidate file once the run is over")]
        delete_candidate: bool,
        #[arg(long, help = "Content store gateway URL")]
        gateway: Option<String>,
    },
    /// Extract and classify the text of one document
    Extract { file: PathBuf },
    /// Compare two plain-text files with the text-only rules
    Compare { reference: PathBuf, candidate: PathBuf },
}

fn print_similarity(similarity: &SimilarityResult) {
    println!("\nTEXT COMPARISON:");
    println!("  Final Similarity: {:.1}%", similarity.final_similarity);
    println!("  Character Similarity: {:.1}%", similarity.character_similarity);
    println!("  Word Similarity: {:.1}%", similarity.word_similarity);
    println!("  Numeric Penalty: {:.0}", similarity.penalty);
    println!(
        "  Potential Tampering: {}",
        if similarity.potential_tampering { "YES" } else { "NO" }
    );

    if !similarity.numeric_mismatches.is_empty() {
        println!("\nNUMERIC MISMATCHES:");
        for mismatch in &similarity.numeric_mismatches {
            println!(
                "  - {} (reference: {}, candidate: {})",
                mismatch.value, mismatch.count_in_reference, mismatch.count_in_candidate
            );
        }
    }

    if !similarity.unique_to_reference.is_empty() {
        println!("\n  Only in reference: {}", similarity.unique_to_reference.join(", "));
    }
    if !similarity.unique_to_candidate.is_empty() {
        println!("  Only in candidate: {}", similarity.unique_to_candidate.join(", "));
    }
}

// Function to print a detailed verification report
fn print_detailed_report(verdict: &Verdict) {
    println!("\n===============================================");
    println!("    CREDENTIAL VERIFICATION DETAILED REPORT");
    println!("===============================================\n");

    println!("RESULT: {}", verdict.status.to_string().to_uppercase());
    println!("  {}", verdict.message);
    println!("  Mode: {}", verdict.mode);
    if let Some(reason) = verdict.fallback_reason {
        println!("  Fallback Reason: {:?}", reason);
    }
    if let Some(advisory) = &verdict.advisory {
        println!("\nNOTE: {}", advisory);
    }

    println!("\nCREDENTIAL TYPE:");
    println!(
        "  Reference: {}",
        verdict
            .reference_classification
            .canonical_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    );
    println!(
        "  Candidate: {}",
        verdict
            .candidate_classification
            .canonical_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    );
    println!("  Types Match: {}", if verdict.type_match { "YES" } else { "NO" });

    print_similarity(&verdict.similarity);

    if let Some(visual) = &verdict.visual {
        println!("\nVISUAL ANALYSIS:");
        println!("  Same Credential Type: {}", visual.same_credential_type);
        println!("  Exact Same Document: {}", visual.exact_same_document);
        println!("  Tampering Severity: {:?}", visual.tampering_severity);
        println!("  Authenticity Score: {}", visual.authenticity_score);
        for field in &visual.specific_tampering {
            println!(
                "  - {}: '{}' -> '{}' ({:?})",
                field.field, field.reference_value, field.candidate_value, field.severity
            );
        }
    }

    if let Some(markers) = &verdict.candidate_markers {
        println!("\nCANDIDATE MARKERS:");
        println!("  Seal: {}", markers.seal_present);
        println!("  Signature: {}", markers.signature_present);
        println!("  Stamp: {}", markers.stamp_present);
    }

    if !verdict.warnings.is_empty() {
        println!("\nWARNINGS:");
        for warning in &verdict.warnings {
            println!("  - {}", warning);
        }
    }

    println!("\nReference SHA-256: {}", verdict.reference_sha256);
    println!("Candidate SHA-256: {}", verdict.candidate_sha256);
    println!("Checked At: {}", verdict.checked_at.to_rfc3339());
}

fn print_failure(failure: &VerificationFailure) {
    eprintln!("Verification failed ({:?}): {}", failure.kind, failure.message);
    eprintln!("{}", failure.user_message);
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CredentialError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CredentialError::InvalidInput(format!("Failed to serialize output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

// The user's own file is only removed on request
fn apply_overrides(config: &mut VerifierConfig, gateway: Option<String>, delete_candidate: bool) {
    if let Some(gateway) = gateway {
        config.gateway = gateway;
    }
    config.retain_candidate = !delete_candidate;
}

async fn run_verify(
    json: bool,
    cid: &str,
    candidate: &Path,
    declared_type: Option<&str>,
    delete_candidate: bool,
    gateway: Option<String>,
) -> Result<bool, CredentialError> {
    let mut config = VerifierConfig::load()?;
    apply_overrides(&mut config, gateway, delete_candidate);

    let verifier = CredentialVerifier::from_config(&config)?;
    let outcome = verifier.run_comparison(cid, candidate, declared_type).await;

    if json {
        print_json(&outcome)?;
    } else {
        match &outcome {
            VerificationOutcome::Completed(verdict) => print_detailed_report(verdict),
            VerificationOutcome::Failed(failure) => print_failure(failure),
        }
    }

    Ok(outcome.verdict().is_some())
}

fn run_extract(json: bool, file: &Path) -> Result<bool, CredentialError> {
    let config = VerifierConfig::load()?;
    let handle = DocumentHandle::borrowed(file)?;
    let extractor = TesseractExtractor::new(
        TempArena::new(config.temp_dir.clone()),
        &config.ocr_language,
        config.tessdata.clone(),
        config.raster_scale,
    );

    let content = extractor.extract(handle.path(), handle.kind())?;
    let classification = CredentialClassifier::new().classify(&content.cleaned_text);

    if json {
        print_json(&serde_json::json!({
            "kind": handle.kind(),
            "sha256": handle.sha256(),
            "content": content,
            "classification": classification,
        }))?;
    } else {
        println!(
            "Document: {} ({})",
            file.display(),
            if handle.kind() == DocumentKind::Pdf { "PDF" } else { "image" }
        );
        println!(
            "Credential Type: {} ({:?})",
            classification
                .canonical_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            classification.confidence
        );
        println!("Usable Characters: {}\n", content.usable_length());
        println!("{}", content.cleaned_text);
    }

    Ok(true)
}

fn run_compare(json: bool, reference: &Path, candidate: &Path) -> Result<bool, CredentialError> {
    let reference_text = std::fs::read_to_string(reference)?;
    let candidate_text = std::fs::read_to_string(candidate)?;

    let classifier = CredentialClassifier::new();
    let similarity = TextComparator::compare(&reference_text, &candidate_text);
    let decision = VerdictClassifier::decide(
        &similarity,
        None,
        &classifier.classify(&reference_text),
        &classifier.classify(&candidate_text),
    );

    if json {
        print_json(&serde_json::json!({
            "status": decision.status,
            "message": decision.message,
            "warnings": decision.warnings,
            "similarity": similarity,
        }))?;
    } else {
        println!("RESULT: {}", decision.status.to_string().to_uppercase());
        println!("  {}", decision.message);
        print_similarity(&similarity);
        for warning in &decision.warnings {
            println!("  - {}", warning);
        }
    }

    Ok(true)
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Verify {
            cid,
            candidate,
            declared_type,
            delete_candidate,
            gateway,
        } => run_verify(cli.json, &cid, &candidate, declared_type.as_deref(), delete_candidate, gateway).await,
        Commands::Extract { file } => run_extract(cli.json, &file),
        Commands::Compare { reference, candidate } => run_compare(cli.json, &reference, &candidate),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verify_args(extra: &[&str]) -> (bool, Option<String>) {
        let mut args = vec!["credverify", "verify", "--cid", "QmReference", "--candidate", "diploma.pdf"];
        args.extend_from_slice(extra);
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Verify {
                delete_candidate,
                gateway,
                ..
            } => (delete_candidate, gateway),
            other => panic!("expected verify, got {:?}", other),
        }
    }

    #[test]
    fn test_candidate_is_kept_by_default() {
        let (delete_candidate, gateway) = verify_args(&[]);
        assert!(!delete_candidate);

        let mut config = VerifierConfig::default();
        apply_overrides(&mut config, gateway, delete_candidate);
        assert!(config.retain_candidate);
    }

    #[test]
    fn test_delete_candidate_is_opt_in() {
        let (delete_candidate, gateway) = verify_args(&["--delete-candidate", "--gateway", "http://localhost:8080"]);
        assert!(delete_candidate);

        let mut config = VerifierConfig::default();
        apply_overrides(&mut config, gateway, delete_candidate);
        assert!(!config.retain_candidate);
        assert_eq!(config.gateway, "http://localhost:8080");
    }
}
