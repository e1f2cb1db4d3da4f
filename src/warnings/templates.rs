//! Known warning sentences and their codes.
//!
//! Each template is a sequence of lines. A line made of a single
//! `<placeholder>` matches any line; a `<placeholder>` inside other text
//! matches any substring. Order matters: when two templates match at the
//! same position the longer one wins, then the earlier one.

/// One known warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningTemplate {
    /// Canonical warning code
    pub code: &'static str,
    /// Line patterns
    pub lines: &'static [&'static str],
}

const fn template(code: &'static str, lines: &'static [&'static str]) -> WarningTemplate {
    WarningTemplate { code, lines }
}

/// Warning table shipped with this release
pub static TEMPLATES: &[WarningTemplate] = &[
    template("CERTIFICATE_ADDED_TO_TRUST_CHAIN", &["Certificate Added to the new Trust Chain: <certificateName>"]),
    template("CERTIFICATE_ALREADY_EXPIRED", &["Certificate has already expired: <expirationDate>"]),
    template("CERTIFICATE_ALREADY_LOADED", &[
        "Certificate data is the same as the certificate that is already loaded for '<keyAlgorithm>'.",
    ]),
    template("CERTIFICATE_AND_TRUST_CHAIN_MISMATCH", &[
        "The certificate and trust chain for '<keyAlgorithm>' do not match.",
    ]),
    template("CERTIFICATE_DATA_BLANK_OR_MISSING", &["Certificate data is blank or missing for '<keyAlgorithm>'."]),
    template("CERTIFICATE_EXPIRATION_DATE_BEYOND_MAX_DAYS", &[
        "The certificate's expiration date is beyond the maximum number of days allowed by the CA/Browser Forum.",
    ]),
    template("CERTIFICATE_EXPIRES_SOON", &["Certificate will expire in less than <days> days."]),
    template("CERTIFICATE_HAS_NULL_ISSUER", &["Certificate has a null issuer"]),
    template("CERTIFICATE_HAS_NULL_SUBJECT", &["Certificate has a null subject"]),
    template("CERTIFICATE_ISSUER_DIFFERENT", &[
        "Certificate Issuer seems to be different than expected. Expected: <expectedIssuer>, found: <actualIssuer>.",
    ]),
    template("CERTIFICATE_KEY_ALGORITHM_MISMATCH", &[
        "Certificate for '<keyAlgorithm>' uses an unexpected key algorithm: <actualAlgorithm>.",
    ]),
    template("CERTIFICATE_KEY_MISMATCH", &[
        "The public key of the certificate for '<keyAlgorithm>' does not match the key in the CSR.",
    ]),
    template("CERTIFICATE_KEY_SIZE_TOO_SMALL", &[
        "The key size of the certificate for '<keyAlgorithm>' is too small: <keySize> bits.",
    ]),
    template("CERTIFICATE_NOT_YET_VALID", &["Certificate is not yet valid. Valid from: <notBefore>"]),
    template("CERTIFICATE_PARSE_FAILURE", &["Unable to parse the certificate for '<keyAlgorithm>'."]),
    template("CERTIFICATE_SIGNATURE_ALGORITHM_MISMATCH", &[
        "The certificate's signature algorithm <actualAlgorithm> does not match the requested algorithm <expectedAlgorithm>.",
    ]),
    template("CERTIFICATE_WEAK_SIGNATURE_ALGORITHM", &[
        "The certificate is signed with a weak signature algorithm: <algorithm>",
    ]),
    template("CN_MISMATCH", &[
        "The common name in the certificate (<actualCommonName>) does not match the common name in the CSR (<expectedCommonName>).",
    ]),
    template("SAN_MISSING", &["The certificate is missing the following Subject Alternative Names: <missingSans>"]),
    template("SAN_EXTRA", &[
        "The certificate contains Subject Alternative Names that were not requested: <extraSans>",
    ]),
    template("WILDCARD_SAN_NOT_ALLOWED", &[
        "Wildcard Subject Alternative Names are not allowed for this certificate type: <sanName>",
    ]),
    template("DNS_NAME_LONGER_THEN_255_CHARS", &["The DNS name '<dnsName>' is longer than 255 characters."]),
    template("DOMAIN_NOT_RESOLVABLE", &["The domain <domain> could not be resolved."]),
    template("CAA_RECORD_RESTRICTS_ISSUANCE", &["The CAA record for <domain> does not allow issuance by <issuer>."]),
    template("ORGANIZATION_MISMATCH", &[
        "The organization in the certificate (<actualOrganization>) does not match the organization in the enrollment (<expectedOrganization>).",
    ]),
    template("EXTRA_CERT_IN_TRUST_CHAIN", &[
        "Extra certificates were found in the chain and are being removed.",
        "<trustChainData>",
    ]),
    template("MISSING_INTERMEDIATE_IN_TRUST_CHAIN", &[
        "The trust chain is missing an intermediate certificate:",
        "<certificateName>",
    ]),
    template("NAMED_TRUST_CHAIN_MISMATCH", &[
        "Expected to find trust chain:",
        "<expectedName>",
        "<expectedDescription>",
        "Instead found:",
        "<actualName>",
        "<actualDescription>",
    ]),
    template("ROOT_CERT_IN_TRUST_CHAIN", &["The trust chain includes a root certificate, which is being removed."]),
    template("TRUST_CHAIN_NOT_IN_ORDER", &[
        "The certificates in the trust chain are not in order and are being reordered.",
    ]),
    template("TRUST_CHAIN_PARSE_FAILURE", &["Unable to parse the trust chain for '<keyAlgorithm>'."]),
    template("TRUST_CHAIN_NULL_OR_EMPTY", &["Trust chain is empty."]),
    template("TRUST_CHAIN_EMPTY_AND_CERTIFICATE_SIGNED_BY_NON_ROOT_CA", &[
        "Trust chain is empty.",
        "The certificate is not signed by a trusted root CA.",
    ]),
    template("UNTRUSTED_ROOT", &["The root certificate of the trust chain is not trusted: <rootName>"]),
];
