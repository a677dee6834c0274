//! Known-answer tests for the SigV4 signer

use chrono::{TimeZone, Utc};
use sdkd_aws::{AwsSigner, SignableRequest, SigningConfig};
use secrecy::SecretString;

fn ses_signer() -> AwsSigner {
    AwsSigner::new(
        SigningConfig::new(
            "AKIDEXAMPLE",
            SecretString::new("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
        )
        .with_region("us-east-1")
        .with_service("email"),
    )
    .unwrap()
}

fn ses_request() -> SignableRequest {
    SignableRequest::new("POST", "https://email.us-east-1.amazonaws.com")
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("Action=SendRawEmail&Destinations.member.1=user%40example.com")
}

#[test]
fn test_canonical_request_vector() {
    let date = Utc.with_ymd_and_hms(2017, 10, 24, 23, 47, 27).unwrap();
    let canonical = ses_signer().canonical_request(&ses_request(), date).unwrap();
    assert_eq!(
        canonical,
        "POST\n/\n\n\
         accept:application/json\n\
         content-type:application/x-www-form-urlencoded\n\
         host:email.us-east-1.amazonaws.com\n\
         x-amz-date:20171024T234727Z\n\n\
         accept;content-type;host;x-amz-date\n\
         2c1ee25120434be2e727113afe8feaaf7d47c78a293b524120e93cd129b4ae44"
    );
}

#[test]
fn test_authorization_vector() {
    let date = Utc.with_ymd_and_hms(2017, 10, 24, 23, 47, 27).unwrap();
    let signed = ses_signer().sign(&ses_request(), date).unwrap();

    assert_eq!(
        signed.authorization,
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20171024/us-east-1/email/aws4_request, \
         SignedHeaders=accept;content-type;host;x-amz-date, \
         Signature=d706dfb68c59876301d71276a0a40d9ac7ebadb597c782b64a8517c61c0a59df"
    );
    assert_eq!(signed.amz_date, "20171024T234727Z");
    assert_eq!(signed.accept, "application/json");
    assert_eq!(signed.content_type.as_deref(), Some("application/x-www-form-urlencoded"));
}

#[test]
fn test_signing_is_pure() {
    let date = Utc.with_ymd_and_hms(2017, 10, 24, 23, 47, 27).unwrap();
    let signer = ses_signer();
    assert_eq!(
        signer.sign(&ses_request(), date).unwrap(),
        signer.sign(&ses_request(), date).unwrap()
    );

    let later = Utc.with_ymd_and_hms(2017, 10, 24, 23, 47, 28).unwrap();
    assert_ne!(
        signer.sign(&ses_request(), date).unwrap().authorization,
        signer.sign(&ses_request(), later).unwrap().authorization
    );
}

#[test]
fn test_header_names_are_case_insensitive() {
    let date = Utc.with_ymd_and_hms(2017, 10, 24, 23, 47, 27).unwrap();
    let lower = SignableRequest::new("post", "https://email.us-east-1.amazonaws.com")
        .with_header("content-type", "application/x-www-form-urlencoded")
        .with_body("Action=SendRawEmail&Destinations.member.1=user%40example.com");
    assert_eq!(
        ses_signer().sign(&lower, date).unwrap(),
        ses_signer().sign(&ses_request(), date).unwrap()
    );
}
