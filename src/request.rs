use clap::ValueEnum;
use reqwest::Client;

use crate::record::{record_from_json, RawPayload};
use crate::{Error, Result};

/// The 4devs online-tools endpoint every generation request is POSTed to.
pub const GENERATOR_ENDPOINT: &str = "https://www.4devs.com.br/ferramentas_online.php";

/// Two-letter codes of the 27 Brazilian federative units; the default region
/// is drawn uniformly from this table.
pub const REGION_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Whether a generated record represents a company or a natural person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Company,
    Person,
}

/// Whether generated identifier values keep their punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MaskMode {
    Masked,
    Unmasked,
}

impl MaskMode {
    /// Wire code the remote form expects in its `pontuacao` field.
    pub fn code(self) -> &'static str {
        match self {
            MaskMode::Masked => "S",
            MaskMode::Unmasked => "N",
        }
    }
}

/// One unit of generation work, fixed at configuration time.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: SubjectKind,
    pub region: String,
    pub age: u32,
    pub mask: MaskMode,
}

/// Thin client around the generation service.
///
/// One outbound POST per [`generate`](Generator::generate) call, no retries;
/// a failed call fails only the unit of work that issued it.
#[derive(Debug, Clone)]
pub struct Generator {
    client: Client,
    endpoint: String,
}

impl Generator {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, GENERATOR_ENDPOINT)
    }

    /// Points the generator at a different endpoint. Tests aim this at a
    /// local mock server.
    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Generator {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Issues one generation request and returns the raw payload.
    ///
    /// Company mode answers with an HTML fragment, person mode with a JSON
    /// document. Any non-success status is a transport failure for this unit
    /// of work only.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<RawPayload> {
        let age = request.age.to_string();
        let form: Vec<(&str, &str)> = match request.kind {
            SubjectKind::Company => vec![
                ("acao", "gerar_empresa"),
                ("pontuacao", request.mask.code()),
                ("estado", &request.region),
                ("idade", &age),
            ],
            // The form only uses a region for people to filter generated
            // addresses by cep_estado, which stays blank here.
            SubjectKind::Person => vec![
                ("acao", "gerar_pessoa"),
                ("sexo", "I"),
                ("pontuacao", request.mask.code()),
                ("idade", &age),
                ("cep_estado", ""),
                ("txt_qtde", "1"),
                ("cep_cidade", ""),
            ],
        };

        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(Error::TransportStatus(response.status()));
        }

        match request.kind {
            SubjectKind::Company => Ok(RawPayload::Markup(response.text().await?)),
            SubjectKind::Person => Ok(RawPayload::Structured(record_from_json(
                response.json().await?,
            ))),
        }
    }
}
