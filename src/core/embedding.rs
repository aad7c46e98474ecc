use std::collections::HashMap;
use tracing::{debug, info};

use crate::models::{Applicant, EncodedApplicant, ListField, ScalarField, TextEmbeddings};
use crate::services::encoder::{EncoderError, TextEncoder};

/// Attach text embeddings to every applicant
///
/// List fields are deduplicated across the whole batch so each distinct
/// phrase is encoded once; scalar fields are trimmed and encoded per
/// applicant. All vectors must share one dimension. Runs once, before any
/// scoring, and any failure aborts the run.
pub async fn encode_applicants<E: TextEncoder>(
    encoder: &E,
    applicants: Vec<Applicant>,
) -> Result<Vec<EncodedApplicant>, EncoderError> {
    let mut embeddings = vec![TextEmbeddings::default(); applicants.len()];
    let mut dimension = None;

    for field in ListField::ALL {
        let (vocabulary, positions) = phrase_vocabulary(&applicants, field);
        info!(
            "Encoding {} unique phrases for {}",
            vocabulary.len(),
            field.name()
        );

        let vectors = encode_checked(encoder, &vocabulary, &mut dimension).await?;
        for (slot, phrase_positions) in embeddings.iter_mut().zip(positions) {
            *field.embeddings_mut(slot) = phrase_positions
                .into_iter()
                .map(|position| vectors[position].clone())
                .collect();
        }
    }

    for field in ScalarField::ALL {
        let texts: Vec<String> = applicants
            .iter()
            .map(|applicant| field.text(applicant).trim().to_string())
            .collect();
        info!("Encoding {} answers for {}", texts.len(), field.name());

        let vectors = encode_checked(encoder, &texts, &mut dimension).await?;
        for (slot, vector) in embeddings.iter_mut().zip(vectors) {
            *field.embedding_mut(slot) = vector;
        }
    }

    Ok(applicants
        .into_iter()
        .zip(embeddings)
        .map(|(applicant, embeddings)| EncodedApplicant {
            applicant,
            embeddings,
        })
        .collect())
}

/// Unique trimmed phrases of a list field in first-seen order, plus each
/// applicant's phrases as positions into that vocabulary
fn phrase_vocabulary(applicants: &[Applicant], field: ListField) -> (Vec<String>, Vec<Vec<usize>>) {
    let mut vocabulary: Vec<String> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    let positions: Vec<Vec<usize>> = applicants
        .iter()
        .map(|applicant| {
            field
                .phrases(applicant)
                .iter()
                .map(|phrase| {
                    let phrase = phrase.trim();
                    *seen.entry(phrase.to_string()).or_insert_with(|| {
                        vocabulary.push(phrase.to_string());
                        vocabulary.len() - 1
                    })
                })
                .collect()
        })
        .collect();

    (vocabulary, positions)
}

async fn encode_checked<E: TextEncoder>(
    encoder: &E,
    texts: &[String],
    dimension: &mut Option<usize>,
) -> Result<Vec<Vec<f32>>, EncoderError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = encoder.encode(texts).await?;
    if vectors.len() != texts.len() {
        return Err(EncoderError::CountMismatch {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }

    for vector in &vectors {
        let expected = *dimension.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(EncoderError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }
    debug!("Encoded {} texts", vectors.len());

    Ok(vectors)
}
