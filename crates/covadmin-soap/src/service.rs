use async_trait::async_trait;
use covadmin_config::{Credentials, Settings};
use covadmin_types::{
    GroupFilterSpec, GroupSearchResult, PageSpec, UserFilterSpec, UserRecord, UserSearchResult,
    UserSpec,
};
use tracing::debug;

use crate::client::{ClientOptions, ServiceKind, SoapClient};
use crate::codec::*;
use crate::protocol::SoapError;

/// User and group administration operations of the configuration service.
#[async_trait]
pub trait ConfigurationService: Send + Sync {
    async fn get_users(
        &self,
        filter: &UserFilterSpec,
        page: &PageSpec,
    ) -> Result<UserSearchResult, SoapError>;

    async fn get_user(&self, username: &str) -> Result<UserRecord, SoapError>;

    async fn get_groups(
        &self,
        filter: &GroupFilterSpec,
        page: &PageSpec,
    ) -> Result<GroupSearchResult, SoapError>;

    async fn create_user(&self, spec: &UserSpec) -> Result<(), SoapError>;
}

pub struct ConfigServiceClient {
    soap: SoapClient,
}

impl ConfigServiceClient {
    pub fn new(soap: SoapClient) -> Self {
        Self { soap }
    }

    pub async fn connect(
        credentials: &Credentials,
        options: &ClientOptions,
    ) -> Result<Self, SoapError> {
        SoapClient::connect(ServiceKind::Configuration, credentials, options)
            .await
            .map(Self::new)
    }
}

#[async_trait]
impl ConfigurationService for ConfigServiceClient {
    async fn get_users(
        &self,
        filter: &UserFilterSpec,
        page: &PageSpec,
    ) -> Result<UserSearchResult, SoapError> {
        debug!(
            "getUsers pattern={} start={} size={}",
            filter.name_pattern, page.start_index, page.page_size
        );
        let xml = self
            .soap
            .call(GET_USERS, &encode_get_users(filter, page))
            .await?;
        decode_get_users(&xml)
    }

    async fn get_user(&self, username: &str) -> Result<UserRecord, SoapError> {
        let xml = self.soap.call(GET_USER, &encode_get_user(username)).await?;
        decode_get_user(&xml)
    }

    async fn get_groups(
        &self,
        filter: &GroupFilterSpec,
        page: &PageSpec,
    ) -> Result<GroupSearchResult, SoapError> {
        debug!(
            "getGroups pattern={} start={} size={}",
            filter.name_pattern, page.start_index, page.page_size
        );
        let xml = self
            .soap
            .call(GET_GROUPS, &encode_get_groups(filter, page))
            .await?;
        decode_get_groups(&xml)
    }

    async fn create_user(&self, spec: &UserSpec) -> Result<(), SoapError> {
        let xml = self
            .soap
            .call(CREATE_USER, &encode_create_user(spec))
            .await?;
        decode_create_user(&xml)
    }
}

/// The defect service only has to be reachable; paging types are shared
/// with the configuration service.
pub struct DefectServiceClient {
    soap: SoapClient,
}

impl DefectServiceClient {
    pub async fn connect(
        credentials: &Credentials,
        options: &ClientOptions,
    ) -> Result<Self, SoapError> {
        let soap = SoapClient::connect(ServiceKind::Defect, credentials, options).await?;
        Ok(Self { soap })
    }

    pub fn endpoint(&self) -> &str {
        self.soap.endpoint()
    }
}

/// Both service connections, opened once at startup and borrowed by every
/// component that talks to the server.
pub struct ServiceContext {
    pub configuration: ConfigServiceClient,
    pub defect: DefectServiceClient,
}

impl ServiceContext {
    pub async fn open(credentials: &Credentials, settings: &Settings) -> Result<Self, SoapError> {
        let options = ClientOptions::from(&settings.connection);
        let defect = DefectServiceClient::connect(credentials, &options).await?;
        let configuration = ConfigServiceClient::connect(credentials, &options).await?;
        Ok(Self {
            configuration,
            defect,
        })
    }
}
