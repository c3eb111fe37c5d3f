//! Test doubles shared across module tests

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RData, RecordType};
use mockall::mock;

use crate::config::Config;
use crate::errors::DnsError;
use crate::providers::{DnsProvider, RecordCreateRequest};

mock! {
    pub Provider {}

    #[async_trait]
    impl DnsProvider for Provider {
        fn configure(&mut self, config: &Config);
        async fn find_zone_id(&self, zone_name: &str) -> Result<String, DnsError>;
        async fn find_record_id(&self, zone_id: &str, record_name: &str) -> Result<String, DnsError>;
        async fn get_record_value(&self, zone_id: &str, record_name_or_id: &str) -> Result<String, DnsError>;
        async fn create_records(&mut self, zone_id: &str, records: &RecordCreateRequest) -> Result<(), DnsError>;
        async fn delete_record(&mut self, zone_id: &str, record_id: &str) -> Result<(), DnsError>;
    }
}

/// Build a single-question DNS query
pub fn query_message(name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(4242)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(
        Name::from_ascii(name).expect("valid query name"),
        record_type,
    ));
    message
}

/// Text of the first string of a TXT answer
pub fn txt_answer(record: &hickory_proto::rr::Record) -> Option<String> {
    match record.data() {
        RData::TXT(txt) => txt
            .txt_data()
            .first()
            .map(|data| String::from_utf8_lossy(data).into_owned()),
        _ => None,
    }
}
