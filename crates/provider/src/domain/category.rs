use crate::{
    domain::Topic,
    error::{Error, Result},
    forum::Forum,
};

/// Chat networks have no categories; every operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Category;

impl Category {
    pub async fn get(_forum: &Forum, _id: &str) -> Result<Category> {
        Err(Error::unsupported("Category::get"))
    }

    pub fn id(&self) -> Result<String> {
        Err(Error::unsupported("Category::id"))
    }

    pub fn name(&self) -> Result<String> {
        Err(Error::unsupported("Category::name"))
    }

    pub fn url(&self) -> Result<String> {
        Err(Error::unsupported("Category::url"))
    }

    pub async fn get_all_topics(&self) -> Result<Vec<Topic>> {
        Err(Error::unsupported("Category::get_all_topics"))
    }

    pub async fn add_topic(&self, _title: &str, _content: &str) -> Result<Topic> {
        Err(Error::unsupported("Category::add_topic"))
    }

    pub async fn watch(&self) -> Result<()> {
        Err(Error::unsupported("Category::watch"))
    }

    pub async fn unwatch(&self) -> Result<()> {
        Err(Error::unsupported("Category::unwatch"))
    }
}
