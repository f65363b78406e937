// Primary vocabulary used to seed an empty skills dictionary.
// Entries are already in canonical (trimmed, lowercase) form.

use crate::skills::{skill_set, SkillSet};

pub const PRIMARY_SKILLS: &[&str] = &[
    // programming languages
    "python", "java", "c++", "c#", "javascript", "typescript", "go (golang)", "rust", "kotlin",
    "swift", "sql", "bash",
    // web development
    "html", "css", "react.js", "angular", "vue.js", "next.js", "node.js", "express.js", "django",
    "flask", "spring boot",
    // databases
    "mysql", "postgresql", "sqlite", "mongodb", "redis", "oracle database",
    "microsoft sql server",
    // devops & ci/cd
    "docker", "kubernetes", "jenkins", "github actions", "gitlab ci/cd", "terraform", "ansible",
    "circleci",
    // cloud platforms
    "amazon web services (aws)", "microsoft azure", "google cloud platform (gcp)", "firebase",
    "heroku", "vercel", "netlify",
    // version control
    "git", "github", "gitlab", "bitbucket",
    // testing
    "junit", "pytest", "jest", "selenium", "cypress", "mockito", "postman",
    // data & ai
    "pandas", "numpy", "scikit-learn", "tensorflow", "pytorch", "keras", "opencv",
    "hugging face", "langchain",
    // data engineering
    "apache kafka", "apache spark", "airflow", "hadoop", "dbt", "snowflake", "bigquery",
    // apis & protocols
    "restful apis", "graphql", "websockets", "oauth2", "jwt",
    // mobile
    "flutter", "react native", "android (kotlin/java)", "ios (swift)",
    // architecture & patterns
    "microservices", "monolithic architecture", "event-driven architecture", "mvc",
    "clean architecture", "design patterns",
    // practices
    "agile", "scrum", "devops", "tdd", "clean code", "system design", "problem solving",
    "code review",
    // security
    "owasp", "tls/ssl", "oauth 2.0", "input validation", "role-based access control (rbac)",
    // tools & ides
    "vscode", "intellij idea", "pycharm", "figma", "notion", "slack",
    // file formats
    "json", "yaml", "xml", "csv", "parquet",
    // misc
    "shell scripting", "api integration", "continuous deployment", "monitoring & logging",
    "nginx", "prometheus", "grafana",
];

pub fn primary_skills() -> SkillSet {
    skill_set(PRIMARY_SKILLS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::normalize_label;

    #[test]
    fn test_primary_vocabulary_is_canonical_and_unique() {
        for label in PRIMARY_SKILLS {
            assert_eq!(*label, normalize_label(label), "not canonical: {label}");
        }
        assert_eq!(primary_skills().len(), PRIMARY_SKILLS.len());
    }
}
